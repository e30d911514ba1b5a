//! IP geolocation
//!
//! Geolocation is an external capability consumed behind [`GeoLookup`].
//! Implementations must never fail: any provider error collapses into an
//! all-null [`GeoInfo`] so a click is never dropped for classification
//! reasons.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Geographic attribution for one client IP. All fields are best-effort.
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolve an IP to a location. Must not fail; return an empty
    /// [`GeoInfo`] instead.
    async fn lookup(&self, ip: &str) -> GeoInfo;
}

/// Lookup service backed by an ip-api.com compatible HTTP endpoint.
pub struct HttpGeoService {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    status: String,
    country: Option<String>,
    city: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

impl HttpGeoService {
    pub fn new(endpoint: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()?;
        Ok(Self { client, endpoint })
    }

    async fn fetch(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!(
            "{}/json/{}?fields=status,country,city,countryCode",
            self.endpoint.trim_end_matches('/'),
            ip
        );

        let response: ProviderResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "success" {
            anyhow::bail!("provider returned status {:?}", response.status);
        }

        Ok(GeoInfo {
            country: response.country,
            city: response.city,
            country_code: response.country_code,
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoService {
    async fn lookup(&self, ip: &str) -> GeoInfo {
        // Loopback and unextractable addresses cannot be located; skip the
        // network round trip entirely.
        if ip == "127.0.0.1" || ip == "::1" || ip == "unknown" || ip.is_empty() {
            return GeoInfo::default();
        }

        match self.fetch(ip).await {
            Ok(info) => info,
            Err(err) => {
                warn!(ip = %ip, error = %err, "geolocation lookup failed");
                GeoInfo::default()
            }
        }
    }
}

/// No-op lookup used when geolocation is disabled.
pub struct DisabledGeo;

#[async_trait]
impl GeoLookup for DisabledGeo {
    async fn lookup(&self, _ip: &str) -> GeoInfo {
        GeoInfo::default()
    }
}
