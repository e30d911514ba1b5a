//! Redirect path tests: code resolution, the 301 contract, and the
//! detached click recording behind it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use snaplink::analytics::geo::DisabledGeo;
use snaplink::analytics::models::ClickAnalytics;
use snaplink::analytics::recorder::ClickRecorder;
use snaplink::redirect;
use snaplink::shortener;
use snaplink::storage::{SqliteStorage, Storage};

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

async fn create_app() -> (Router, Arc<dyn Storage>) {
    let storage: Arc<dyn Storage> =
        Arc::new(SqliteStorage::new("sqlite::memory:", 1).await.unwrap());
    storage.init().await.unwrap();

    let recorder = Arc::new(ClickRecorder::new(
        Arc::clone(&storage),
        Arc::new(DisabledGeo),
    ));
    let app = redirect::create_redirect_router(Arc::clone(&storage), recorder);
    (app, storage)
}

fn request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let addr: SocketAddr = "192.0.2.7:40000".parse().unwrap();
    builder
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .unwrap()
}

/// Recording is detached from the response, so give the spawned task a
/// moment to land before asserting on the stored clicks.
async fn wait_for_clicks(
    storage: &Arc<dyn Storage>,
    link_id: i64,
    expected: i64,
) -> ClickAnalytics {
    for _ in 0..100 {
        let analytics = storage.link_analytics(link_id).await.unwrap();
        if analytics.total_clicks >= expected {
            return analytics;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("click for link {link_id} never arrived");
}

#[tokio::test]
async fn redirect_is_a_permanent_301() {
    let (app, storage) = create_app().await;

    let link = shortener::allocate(
        storage.as_ref(),
        "https://example.com/landing",
        None,
        None,
    )
    .await
    .unwrap();

    let response = app
        .oneshot(request(&format!("/{}", link.short_code), &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/landing"
    );
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let (app, _storage) = create_app().await;

    let response = app.oneshot(request("/nosuch", &[])).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redirect_records_the_click_with_request_attribution() {
    let (app, storage) = create_app().await;

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, None)
        .await
        .unwrap();

    let response = app
        .oneshot(request(
            &format!("/{}", link.short_code),
            &[
                ("user-agent", CHROME_UA),
                ("x-forwarded-for", "203.0.113.5, 10.0.0.1"),
                ("referer", "https://social.example/post"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);

    let analytics = wait_for_clicks(&storage, link.id, 1).await;
    assert_eq!(analytics.total_clicks, 1);
    assert_eq!(analytics.unique_visitors, 1);
    assert_eq!(analytics.clicks_by_device[0].device, "Desktop");
    assert_eq!(analytics.clicks_by_browser[0].browser, "Chrome");

    let click = &analytics.recent_clicks[0];
    assert_eq!(click.referer, "https://social.example/post");
    // Geolocation is disabled here, so attribution falls back.
    assert_eq!(click.country, "Unknown");
}

#[tokio::test]
async fn socket_address_backs_the_ip_when_headers_are_absent() {
    let (app, storage) = create_app().await;

    let link = shortener::allocate(storage.as_ref(), "https://example.com", None, None)
        .await
        .unwrap();

    // Two bare hits from the same socket address count as one visitor.
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(
                &format!("/{}", link.short_code),
                &[("user-agent", CHROME_UA)],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    }

    let analytics = wait_for_clicks(&storage, link.id, 2).await;
    assert_eq!(analytics.total_clicks, 2);
    assert_eq!(analytics.unique_visitors, 1);
}
