use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::analytics::recorder::ClickRecorder;
use crate::storage::Storage;

use super::handlers::{redirect_url, RedirectState};

pub fn create_redirect_router(storage: Arc<dyn Storage>, recorder: Arc<ClickRecorder>) -> Router {
    let state = Arc::new(RedirectState { storage, recorder });

    Router::new()
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
