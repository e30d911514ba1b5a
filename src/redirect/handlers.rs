use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::{LOCATION, REFERER, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::ip_extractor::extract_client_ip;
use crate::analytics::recorder::ClickRecorder;
use crate::storage::Storage;

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub recorder: Arc<ClickRecorder>,
}

/// Resolve a short code and issue a 301 to the original URL.
///
/// Click recording is detached from the response path: the visitor is
/// redirected whether or not the click lands. Missing, inactive, and
/// malformed codes all produce the same generic 404.
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let link = match state.storage.get_active_link_by_code(&code).await {
        Ok(Some(link)) => link,
        Ok(None) => return (StatusCode::NOT_FOUND, "URL not found").into_response(),
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "redirect lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    let ip_address = extract_client_ip(&headers, Some(remote_addr));
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let referer = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    state
        .recorder
        .spawn_record(link.id, ip_address, user_agent, referer);

    (
        StatusCode::MOVED_PERMANENTLY,
        [(LOCATION, link.original_url)],
    )
        .into_response()
}
