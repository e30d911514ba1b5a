//! Derived analytics views

use chrono::{TimeZone, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Full per-link analytics, computed fresh from the click set at query time.
#[derive(Debug, Clone, Serialize)]
pub struct ClickAnalytics {
    pub total_clicks: i64,
    /// Distinct IP addresses; a crude visitor proxy, no cookie dedup.
    pub unique_visitors: i64,
    pub clicks_by_day: Vec<DayClicks>,
    pub clicks_by_country: Vec<CountryClicks>,
    pub clicks_by_device: Vec<DeviceClicks>,
    pub clicks_by_browser: Vec<BrowserClicks>,
    pub recent_clicks: Vec<RecentClick>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DayClicks {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryClicks {
    pub country: String,
    pub clicks: i64,
    /// Integer share of total clicks, `round(100 * clicks / total)`.
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceClicks {
    pub device: String,
    pub clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserClicks {
    pub browser: String,
    pub clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentClick {
    /// RFC 3339 timestamp of the click.
    pub timestamp: String,
    pub country: String,
    pub city: String,
    pub device: String,
    pub browser: String,
    pub referer: String,
}

impl CountryClicks {
    pub fn from_row(country: Option<String>, clicks: i64, total_clicks: i64) -> Self {
        let percentage = if total_clicks > 0 {
            ((clicks as f64 / total_clicks as f64) * 100.0).round() as i64
        } else {
            0
        };
        Self {
            country: country.unwrap_or_else(|| "Unknown".to_string()),
            clicks,
            percentage,
        }
    }
}

impl RecentClick {
    pub fn from_row(
        clicked_at: i64,
        country: Option<String>,
        city: Option<String>,
        device: Option<String>,
        browser: Option<String>,
        referer: Option<String>,
    ) -> Self {
        let timestamp = Utc
            .timestamp_opt(clicked_at, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        Self {
            timestamp,
            country: country.unwrap_or_else(|| "Unknown".to_string()),
            city: city.unwrap_or_else(|| "Unknown".to_string()),
            device: device.unwrap_or_else(|| "Unknown".to_string()),
            browser: browser.unwrap_or_else(|| "Unknown".to_string()),
            referer: referer.unwrap_or_else(|| "Direct".to_string()),
        }
    }
}

/// A link annotated with its click statistics, for the owner's list view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LinkWithStats {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub custom_slug: Option<String>,
    pub owner_id: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub click_count: i64,
    pub unique_clicks: i64,
    pub last_clicked: Option<i64>,
    pub top_country: Option<String>,
}

/// Dashboard roll-up across all of one owner's links.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerStats {
    pub total_urls: i64,
    pub total_clicks: i64,
    /// Clicks per URL, rounded to two decimals; 0 with no URLs.
    pub click_rate: f64,
    pub top_country: Option<String>,
}
