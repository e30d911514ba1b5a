//! Fire-and-forget click recording
//!
//! Recording runs on a detached task so the redirect response never waits
//! on classification, geolocation, or the insert. Failures are logged and
//! swallowed; there is no ordering guarantee between the redirect being
//! issued and the click being durable.

use std::sync::Arc;

use anyhow::Result;

use crate::analytics::classifier::parse_user_agent;
use crate::analytics::geo::GeoLookup;
use crate::models::ClickEvent;
use crate::storage::Storage;

pub struct ClickRecorder {
    storage: Arc<dyn Storage>,
    geo: Arc<dyn GeoLookup>,
}

impl ClickRecorder {
    pub fn new(storage: Arc<dyn Storage>, geo: Arc<dyn GeoLookup>) -> Self {
        Self { storage, geo }
    }

    /// Classify and persist one hit.
    pub async fn record(
        &self,
        link_id: i64,
        ip_address: String,
        user_agent: String,
        referer: Option<String>,
    ) -> Result<()> {
        let info = parse_user_agent(&user_agent);
        let geo = self.geo.lookup(&ip_address).await;

        let click = ClickEvent {
            link_id,
            ip_address,
            user_agent,
            referer,
            country: geo.country,
            city: geo.city,
            device: info.device,
            browser: info.browser,
            os: info.os,
        };

        self.storage.insert_click(&click).await
    }

    /// Spawn [`record`](Self::record) on a detached task. The caller's
    /// response path is never delayed or failed by the outcome.
    pub fn spawn_record(
        self: &Arc<Self>,
        link_id: i64,
        ip_address: String,
        user_agent: String,
        referer: Option<String>,
    ) {
        let recorder = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = recorder
                .record(link_id, ip_address, user_agent, referer)
                .await
            {
                tracing::warn!(link_id, error = %err, "failed to record click");
            }
        });
    }
}
