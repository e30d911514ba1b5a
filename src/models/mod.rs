use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One shortening mapping. `short_code` is globally unique; when the caller
/// supplied a custom slug, the slug *is* the short code and is also kept in
/// `custom_slug`. `expires_at` is stored but not enforced on any read path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub custom_slug: Option<String>,
    pub owner_id: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

/// Payload for one recorded visit. The storage layer assigns the row id and
/// the `clicked_at` timestamp at insert time; rows are append-only and only
/// ever removed by cascade when the owning link is deleted.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub link_id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device: String,
    pub browser: String,
    pub os: String,
}

/// Per-session counter backing the anonymous URL quota.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnonymousSession {
    pub id: i64,
    pub session_id: String,
    pub url_count: i64,
    pub created_at: i64,
    pub last_access_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub original_url: String,
    pub custom_slug: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub id: i64,
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub is_anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_urls: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub url_count: i64,
    pub remaining_urls: i64,
}
