use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::analytics::models::{
    BrowserClicks, ClickAnalytics, CountryClicks, DayClicks, DeviceClicks, LinkWithStats,
    OwnerStats, RecentClick,
};
use crate::models::{AnonymousSession, ClickEvent, ShortLink};
use crate::storage::{Storage, StorageError, StorageResult};

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                custom_slug TEXT,
                owner_id TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at BIGINT NOT NULL,
                expires_at BIGINT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_short_code ON links(short_code)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner_id ON links(owner_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id BIGSERIAL PRIMARY KEY,
                link_id BIGINT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                ip_address TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                referer TEXT,
                country TEXT,
                city TEXT,
                device TEXT,
                browser TEXT,
                os TEXT,
                clicked_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_link_id ON clicks(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_clicked_at ON clicks(clicked_at)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS anon_sessions (
                id BIGSERIAL PRIMARY KEY,
                session_id TEXT NOT NULL UNIQUE,
                url_count BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL,
                last_access_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        custom_slug: Option<&str>,
        owner_id: Option<&str>,
    ) -> StorageResult<ShortLink> {
        // ON CONFLICT DO NOTHING yields no row on a collision.
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            INSERT INTO links (short_code, original_url, custom_slug, owner_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            ON CONFLICT (short_code) DO NOTHING
            RETURNING id, short_code, original_url, custom_slug, owner_id, is_active, created_at, expires_at
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .bind(custom_slug)
        .bind(owner_id)
        .bind(now())
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        link.ok_or(StorageError::Conflict)
    }

    async fn get_link(&self, id: i64) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, original_url, custom_slug, owner_id, is_active, created_at, expires_at
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_active_link_by_code(&self, short_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, original_url, custom_slug, owner_id, is_active, created_at, expires_at
            FROM links
            WHERE short_code = $1 AND is_active = TRUE
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn list_links_by_owner(&self, owner_id: &str) -> Result<Vec<LinkWithStats>> {
        let links = sqlx::query_as::<_, LinkWithStats>(
            r#"
            SELECT
                l.id, l.short_code, l.original_url, l.custom_slug, l.owner_id,
                l.is_active, l.created_at, l.expires_at,
                (SELECT COUNT(*) FROM clicks c WHERE c.link_id = l.id) AS click_count,
                (SELECT COUNT(DISTINCT c.ip_address) FROM clicks c WHERE c.link_id = l.id) AS unique_clicks,
                (SELECT MAX(c.clicked_at) FROM clicks c WHERE c.link_id = l.id) AS last_clicked,
                (SELECT c.country FROM clicks c WHERE c.link_id = l.id
                 GROUP BY c.country ORDER BY COUNT(*) DESC LIMIT 1) AS top_country
            FROM links l
            WHERE l.owner_id = $1
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn delete_link(&self, id: i64, owner_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM links
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_click(&self, click: &ClickEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clicks
                (link_id, ip_address, user_agent, referer, country, city, device, browser, os, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(click.link_id)
        .bind(&click.ip_address)
        .bind(&click.user_agent)
        .bind(&click.referer)
        .bind(&click.country)
        .bind(&click.city)
        .bind(&click.device)
        .bind(&click.browser)
        .bind(&click.os)
        .bind(now())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn link_analytics(&self, link_id: i64) -> Result<ClickAnalytics> {
        let total_clicks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE link_id = $1")
                .bind(link_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        let unique_visitors: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT ip_address) FROM clicks WHERE link_id = $1")
                .bind(link_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        // Most recent 30 distinct days, output ascending by date.
        let clicks_by_day = sqlx::query_as::<_, DayClicks>(
            r#"
            SELECT date, clicks FROM (
                SELECT to_char(to_timestamp(clicked_at), 'YYYY-MM-DD') AS date,
                       COUNT(*) AS clicks
                FROM clicks
                WHERE link_id = $1
                GROUP BY 1
                ORDER BY date DESC
                LIMIT 30
            ) AS recent_days
            ORDER BY date ASC
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let country_rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT country, COUNT(*) AS clicks
            FROM clicks
            WHERE link_id = $1
            GROUP BY country
            ORDER BY clicks DESC
            LIMIT 10
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let clicks_by_country = country_rows
            .into_iter()
            .map(|(country, clicks)| CountryClicks::from_row(country, clicks, total_clicks))
            .collect();

        let device_rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT device, COUNT(*) AS clicks
            FROM clicks
            WHERE link_id = $1
            GROUP BY device
            ORDER BY clicks DESC
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let clicks_by_device = device_rows
            .into_iter()
            .map(|(device, clicks)| DeviceClicks {
                device: device.unwrap_or_else(|| "Unknown".to_string()),
                clicks,
            })
            .collect();

        let browser_rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT browser, COUNT(*) AS clicks
            FROM clicks
            WHERE link_id = $1
            GROUP BY browser
            ORDER BY clicks DESC
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let clicks_by_browser = browser_rows
            .into_iter()
            .map(|(browser, clicks)| BrowserClicks {
                browser: browser.unwrap_or_else(|| "Unknown".to_string()),
                clicks,
            })
            .collect();

        // id is the tiebreak for clicks landing in the same second.
        let recent_rows: Vec<(
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = sqlx::query_as(
            r#"
            SELECT clicked_at, country, city, device, browser, referer
            FROM clicks
            WHERE link_id = $1
            ORDER BY clicked_at DESC, id DESC
            LIMIT 50
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let recent_clicks = recent_rows
            .into_iter()
            .map(|(clicked_at, country, city, device, browser, referer)| {
                RecentClick::from_row(clicked_at, country, city, device, browser, referer)
            })
            .collect();

        Ok(ClickAnalytics {
            total_clicks,
            unique_visitors,
            clicks_by_day,
            clicks_by_country,
            clicks_by_device,
            clicks_by_browser,
            recent_clicks,
        })
    }

    async fn owner_stats(&self, owner_id: &str) -> Result<OwnerStats> {
        let total_urls: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        let total_clicks: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM clicks c
            JOIN links l ON c.link_id = l.id
            WHERE l.owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        let top_country: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT c.country
            FROM clicks c
            JOIN links l ON c.link_id = l.id
            WHERE l.owner_id = $1
            GROUP BY c.country
            ORDER BY COUNT(*) DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        let click_rate = if total_urls > 0 {
            ((total_clicks as f64 / total_urls as f64) * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(OwnerStats {
            total_urls,
            total_clicks,
            click_rate,
            top_country: top_country.and_then(|row| row.0),
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<AnonymousSession>> {
        let session = sqlx::query_as::<_, AnonymousSession>(
            r#"
            SELECT id, session_id, url_count, created_at, last_access_at
            FROM anon_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(session)
    }

    async fn ensure_session(&self, session_id: &str) -> Result<AnonymousSession> {
        let ts = now();

        sqlx::query(
            r#"
            INSERT INTO anon_sessions (session_id, url_count, created_at, last_access_at)
            VALUES ($1, 0, $2, $3)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(ts)
        .bind(ts)
        .execute(self.pool.as_ref())
        .await?;

        let session = sqlx::query_as::<_, AnonymousSession>(
            r#"
            SELECT id, session_id, url_count, created_at, last_access_at
            FROM anon_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(session)
    }

    async fn increment_session(&self, session_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE anon_sessions
            SET url_count = url_count + 1, last_access_at = $1
            WHERE session_id = $2
            "#,
        )
        .bind(now())
        .bind(session_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
