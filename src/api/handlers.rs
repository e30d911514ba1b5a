use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::analytics::models::{ClickAnalytics, LinkWithStats, OwnerStats};
use crate::error::ServiceError;
use crate::models::{SessionInfoResponse, ShortLink, ShortenRequest, ShortenResponse};
use crate::quota::QuotaTracker;
use crate::shortener;
use crate::storage::Storage;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub quota: QuotaTracker,
    pub short_domain: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct LinkListItem {
    #[serde(flatten)]
    pub link: LinkWithStats,
    pub short_url: String,
}

#[derive(Serialize)]
pub struct LinkDetail {
    #[serde(flatten)]
    pub link: ShortLink,
    pub short_url: String,
}

#[derive(Serialize)]
pub struct LinkAnalyticsResponse {
    pub url: LinkDetail,
    pub analytics: ClickAnalytics,
}

/// Owner identity, pre-extracted by the auth layer in front of this service.
fn owner_id(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-user-id")
}

/// Opaque anonymous-session key, assigned by the session transport.
fn session_id(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-session-id")
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Shorten a URL. Anonymous callers go through the quota tracker first and
/// get a `remaining_urls` count back.
pub async fn shorten_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, ServiceError> {
    let original_url = payload.original_url.trim();
    if original_url.is_empty() {
        return Err(ServiceError::Validation(
            "Please enter a URL to shorten".to_string(),
        ));
    }

    let normalized = shortener::normalize_url(original_url);
    url::Url::parse(&normalized)
        .map_err(|_| ServiceError::Validation("Please enter a valid URL".to_string()))?;

    let custom_slug = payload
        .custom_slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(slug) = custom_slug {
        if !shortener::is_valid_slug(slug) {
            return Err(ServiceError::Validation(
                "Only letters, numbers, hyphens, and underscores allowed".to_string(),
            ));
        }
    }

    if let Some(owner) = owner_id(&headers) {
        let link =
            shortener::allocate(state.storage.as_ref(), &normalized, custom_slug, Some(&owner))
                .await?;

        return Ok(Json(ShortenResponse {
            id: link.id,
            short_url: shortener::build_short_url(&state.short_domain, &link.short_code),
            short_code: link.short_code,
            original_url: link.original_url,
            is_anonymous: false,
            remaining_urls: None,
        }));
    }

    let session = session_id(&headers).ok_or_else(|| {
        ServiceError::Validation("Missing session identifier for anonymous request".to_string())
    })?;

    let counter = state.quota.check(&session).await?;

    let link = shortener::allocate(state.storage.as_ref(), &normalized, custom_slug, None).await?;

    state.quota.commit(&session).await?;

    Ok(Json(ShortenResponse {
        id: link.id,
        short_url: shortener::build_short_url(&state.short_domain, &link.short_code),
        short_code: link.short_code,
        original_url: link.original_url,
        is_anonymous: true,
        remaining_urls: Some(QuotaTracker::remaining(counter.url_count + 1)),
    }))
}

/// List the caller's links, newest first, with click statistics.
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LinkListItem>>, ServiceError> {
    let owner = owner_id(&headers).ok_or(ServiceError::Unauthorized)?;

    let links = state.storage.list_links_by_owner(&owner).await?;

    let items = links
        .into_iter()
        .map(|link| {
            let short_url = shortener::build_short_url(&state.short_domain, &link.short_code);
            LinkListItem { link, short_url }
        })
        .collect();

    Ok(Json(items))
}

/// Per-link analytics. Ownership is checked first; a link the caller does
/// not own is indistinguishable from a missing one.
pub async fn link_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<LinkAnalyticsResponse>, ServiceError> {
    let owner = owner_id(&headers).ok_or(ServiceError::Unauthorized)?;

    let link = state
        .storage
        .get_link(id)
        .await?
        .filter(|link| link.owner_id.as_deref() == Some(owner.as_str()))
        .ok_or(ServiceError::NotFound)?;

    let analytics = state.storage.link_analytics(id).await?;

    let short_url = shortener::build_short_url(&state.short_domain, &link.short_code);

    Ok(Json(LinkAnalyticsResponse {
        url: LinkDetail { link, short_url },
        analytics,
    }))
}

/// Hard-delete a link (scoped to its owner; clicks cascade).
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    let owner = owner_id(&headers).ok_or(ServiceError::Unauthorized)?;

    let deleted = state.storage.delete_link(id, &owner).await?;
    if !deleted {
        return Err(ServiceError::NotFound);
    }

    Ok(Json(SuccessResponse {
        message: "URL deleted successfully".to_string(),
    }))
}

/// Dashboard summary for the caller's links.
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<OwnerStats>, ServiceError> {
    let owner = owner_id(&headers).ok_or(ServiceError::Unauthorized)?;

    let stats = state.storage.owner_stats(&owner).await?;
    Ok(Json(stats))
}

/// Quota status for the caller's anonymous session. A session with no
/// record yet reports the full allowance.
pub async fn session_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionInfoResponse>, ServiceError> {
    let url_count = match session_id(&headers) {
        Some(session) => state
            .storage
            .get_session(&session)
            .await?
            .map(|s| s.url_count)
            .unwrap_or(0),
        None => 0,
    };

    Ok(Json(SessionInfoResponse {
        url_count,
        remaining_urls: QuotaTracker::remaining(url_count),
    }))
}

/// Health check; pings the database to warm it up.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    state.storage.ping().await?;
    Ok(Json(SuccessResponse {
        message: "OK".to_string(),
    }))
}
