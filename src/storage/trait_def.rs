use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::analytics::models::{ClickAnalytics, LinkWithStats, OwnerStats};
use crate::models::{AnonymousSession, ClickEvent, ShortLink};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes).
    async fn init(&self) -> Result<()>;

    /// Connectivity check (`SELECT 1`), used by the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Insert a link with the given short code in one atomic statement.
    /// Uniqueness is enforced by the database constraint on `short_code`;
    /// a violation surfaces as [`StorageError::Conflict`].
    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        custom_slug: Option<&str>,
        owner_id: Option<&str>,
    ) -> StorageResult<ShortLink>;

    /// Get a link by id regardless of active state.
    async fn get_link(&self, id: i64) -> Result<Option<ShortLink>>;

    /// Get an active link by short code. Inactive links resolve to `None`
    /// so the redirect path cannot distinguish them from missing codes.
    async fn get_active_link_by_code(&self, short_code: &str) -> Result<Option<ShortLink>>;

    /// All links owned by `owner_id`, newest first, annotated with click
    /// statistics.
    async fn list_links_by_owner(&self, owner_id: &str) -> Result<Vec<LinkWithStats>>;

    /// Hard-delete a link scoped to its owner. Click rows go with it via
    /// cascade. Returns false when no row matched.
    async fn delete_link(&self, id: i64, owner_id: &str) -> Result<bool>;

    /// Append one click row; `id` and `clicked_at` are assigned here.
    async fn insert_click(&self, click: &ClickEvent) -> Result<()>;

    /// Derived analytics views over one link's click set.
    async fn link_analytics(&self, link_id: i64) -> Result<ClickAnalytics>;

    /// Dashboard roll-up across one owner's links.
    async fn owner_stats(&self, owner_id: &str) -> Result<OwnerStats>;

    /// Look up an anonymous session record by its opaque key.
    async fn get_session(&self, session_id: &str) -> Result<Option<AnonymousSession>>;

    /// Fetch-or-create the session record (upsert-by-key, counter starts
    /// at 0).
    async fn ensure_session(&self, session_id: &str) -> Result<AnonymousSession>;

    /// Increment the session's URL counter by exactly 1.
    async fn increment_session(&self, session_id: &str) -> Result<()>;
}
