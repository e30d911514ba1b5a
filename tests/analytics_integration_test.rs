//! Click recording and aggregation tests against in-memory SQLite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use snaplink::analytics::geo::{GeoInfo, GeoLookup};
use snaplink::analytics::recorder::ClickRecorder;
use snaplink::shortener;
use snaplink::storage::{SqliteStorage, Storage};

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) \
                         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 \
                         Mobile/15E148 Safari/604.1";

async fn create_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Geo stub resolving fixed IPs; everything else comes back empty, the
/// same shape a failed provider lookup produces.
struct MapGeo(HashMap<&'static str, GeoInfo>);

impl MapGeo {
    fn with_demo_data() -> Self {
        let mut map = HashMap::new();
        map.insert(
            "203.0.113.1",
            GeoInfo {
                country: Some("India".to_string()),
                city: Some("Mumbai".to_string()),
                country_code: Some("IN".to_string()),
            },
        );
        map.insert(
            "198.51.100.1",
            GeoInfo {
                country: Some("United States".to_string()),
                city: Some("Portland".to_string()),
                country_code: Some("US".to_string()),
            },
        );
        Self(map)
    }
}

#[async_trait]
impl GeoLookup for MapGeo {
    async fn lookup(&self, ip: &str) -> GeoInfo {
        self.0.get(ip).cloned().unwrap_or_default()
    }
}

fn recorder(storage: &Arc<dyn Storage>) -> ClickRecorder {
    ClickRecorder::new(Arc::clone(storage), Arc::new(MapGeo::with_demo_data()))
}

#[tokio::test]
async fn analytics_groupings_and_percentages() {
    let storage = create_storage().await;
    let rec = recorder(&storage);

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, Some("u1"))
        .await
        .unwrap();

    // One Indian mobile visitor, two American desktop visitors (same IP).
    rec.record(link.id, "203.0.113.1".into(), IPHONE_UA.into(), None)
        .await
        .unwrap();
    for _ in 0..2 {
        rec.record(
            link.id,
            "198.51.100.1".into(),
            CHROME_UA.into(),
            Some("https://news.example".into()),
        )
        .await
        .unwrap();
    }

    let analytics = storage.link_analytics(link.id).await.unwrap();

    assert_eq!(analytics.total_clicks, 3);
    assert_eq!(analytics.unique_visitors, 2);

    // Countries descend by count; percentages are integer-rounded shares.
    assert_eq!(analytics.clicks_by_country.len(), 2);
    assert_eq!(analytics.clicks_by_country[0].country, "United States");
    assert_eq!(analytics.clicks_by_country[0].clicks, 2);
    assert_eq!(analytics.clicks_by_country[0].percentage, 67);
    assert_eq!(analytics.clicks_by_country[1].country, "India");
    assert_eq!(analytics.clicks_by_country[1].percentage, 33);

    assert_eq!(analytics.clicks_by_device[0].device, "Desktop");
    assert_eq!(analytics.clicks_by_device[0].clicks, 2);
    assert_eq!(analytics.clicks_by_device[1].device, "Mobile");

    assert_eq!(analytics.clicks_by_browser[0].browser, "Chrome");
    assert_eq!(analytics.clicks_by_browser[1].browser, "Safari");

    // All three clicks land on the same calendar day.
    assert_eq!(analytics.clicks_by_day.len(), 1);
    assert_eq!(analytics.clicks_by_day[0].clicks, 3);

    // Recent clicks carry fallbacks for missing fields.
    assert_eq!(analytics.recent_clicks.len(), 3);
    let newest = &analytics.recent_clicks[0];
    assert_eq!(newest.country, "United States");
    assert_eq!(newest.referer, "https://news.example");
    let oldest = analytics.recent_clicks.last().unwrap();
    assert_eq!(oldest.country, "India");
    assert_eq!(oldest.referer, "Direct");
}

#[tokio::test]
async fn empty_link_has_empty_analytics() {
    let storage = create_storage().await;

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, Some("u1"))
        .await
        .unwrap();

    let analytics = storage.link_analytics(link.id).await.unwrap();
    assert_eq!(analytics.total_clicks, 0);
    assert_eq!(analytics.unique_visitors, 0);
    assert!(analytics.clicks_by_day.is_empty());
    assert!(analytics.clicks_by_country.is_empty());
    assert!(analytics.recent_clicks.is_empty());
}

#[tokio::test]
async fn recent_clicks_cap_at_fifty() {
    let storage = create_storage().await;
    let rec = recorder(&storage);

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, Some("u1"))
        .await
        .unwrap();

    for i in 0..60 {
        rec.record(link.id, format!("10.0.0.{i}"), CHROME_UA.into(), None)
            .await
            .unwrap();
    }

    let analytics = storage.link_analytics(link.id).await.unwrap();
    assert_eq!(analytics.total_clicks, 60);
    assert_eq!(analytics.recent_clicks.len(), 50);
    assert_eq!(analytics.unique_visitors, 60);
}

#[tokio::test]
async fn failed_geo_lookup_still_records_the_click() {
    let storage = create_storage().await;
    let rec = recorder(&storage);

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, Some("u1"))
        .await
        .unwrap();

    // Unmapped IP: the stub returns the all-null shape of a failed lookup.
    rec.record(link.id, "192.0.2.250".into(), CHROME_UA.into(), None)
        .await
        .unwrap();

    let analytics = storage.link_analytics(link.id).await.unwrap();
    assert_eq!(analytics.total_clicks, 1);
    assert_eq!(analytics.clicks_by_country[0].country, "Unknown");
    assert_eq!(analytics.clicks_by_country[0].percentage, 100);
    assert_eq!(analytics.recent_clicks[0].city, "Unknown");
}

#[tokio::test]
async fn owner_list_and_stats() {
    let storage = create_storage().await;
    let rec = recorder(&storage);

    let first = shortener::allocate(storage.as_ref(), "https://example.com/1", None, Some("u1"))
        .await
        .unwrap();
    let second = shortener::allocate(storage.as_ref(), "https://example.com/2", None, Some("u1"))
        .await
        .unwrap();
    let foreign = shortener::allocate(storage.as_ref(), "https://example.com/3", None, Some("u2"))
        .await
        .unwrap();

    for _ in 0..3 {
        rec.record(first.id, "203.0.113.1".into(), IPHONE_UA.into(), None)
            .await
            .unwrap();
    }
    rec.record(foreign.id, "198.51.100.1".into(), CHROME_UA.into(), None)
        .await
        .unwrap();

    let links = storage.list_links_by_owner("u1").await.unwrap();
    assert_eq!(links.len(), 2);
    // Newest first; both created in the same second, so id breaks the tie.
    assert_eq!(links[0].id, second.id);
    assert_eq!(links[0].click_count, 0);
    assert!(links[0].last_clicked.is_none());
    assert!(links[0].top_country.is_none());
    assert_eq!(links[1].id, first.id);
    assert_eq!(links[1].click_count, 3);
    assert_eq!(links[1].unique_clicks, 1);
    assert!(links[1].last_clicked.is_some());
    assert_eq!(links[1].top_country.as_deref(), Some("India"));

    let stats = storage.owner_stats("u1").await.unwrap();
    assert_eq!(stats.total_urls, 2);
    assert_eq!(stats.total_clicks, 3);
    assert_eq!(stats.click_rate, 1.5);
    assert_eq!(stats.top_country.as_deref(), Some("India"));

    // An owner with no links divides nothing.
    let empty = storage.owner_stats("nobody").await.unwrap();
    assert_eq!(empty.total_urls, 0);
    assert_eq!(empty.click_rate, 0.0);
    assert!(empty.top_country.is_none());
}

#[tokio::test]
async fn deleting_a_link_cascades_to_its_clicks() {
    let storage = create_storage().await;
    let rec = recorder(&storage);

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, Some("u1"))
        .await
        .unwrap();
    rec.record(link.id, "203.0.113.1".into(), CHROME_UA.into(), None)
        .await
        .unwrap();

    // Wrong owner deletes nothing.
    assert!(!storage.delete_link(link.id, "intruder").await.unwrap());
    assert!(storage.delete_link(link.id, "u1").await.unwrap());

    assert!(storage.get_link(link.id).await.unwrap().is_none());
    let stats = storage.owner_stats("u1").await.unwrap();
    assert_eq!(stats.total_urls, 0);
    assert_eq!(stats.total_clicks, 0);
}
