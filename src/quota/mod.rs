//! Anonymous session quota
//!
//! Anonymous sessions may shorten at most [`ANONYMOUS_URL_LIMIT`] URLs.
//! The check and the increment are separate storage operations, so
//! concurrent requests from one session can transiently overshoot the
//! limit; this is a soft quota, not a hard guarantee.

use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::AnonymousSession;
use crate::storage::Storage;

pub const ANONYMOUS_URL_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct QuotaTracker {
    storage: Arc<dyn Storage>,
}

impl QuotaTracker {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Fetch-or-create the session record and reject when the limit is
    /// already reached. The counter starts at 0 for a fresh session.
    pub async fn check(&self, session_id: &str) -> Result<AnonymousSession, ServiceError> {
        let session = self.storage.ensure_session(session_id).await?;
        if session.url_count >= ANONYMOUS_URL_LIMIT {
            return Err(ServiceError::QuotaExceeded);
        }
        Ok(session)
    }

    /// Count a successful anonymous shorten (increment by exactly 1).
    pub async fn commit(&self, session_id: &str) -> Result<(), ServiceError> {
        self.storage.increment_session(session_id).await?;
        Ok(())
    }

    pub fn remaining(url_count: i64) -> i64 {
        (ANONYMOUS_URL_LIMIT - url_count).max(0)
    }
}
