//! End-to-end tests of the feature API router against in-memory bundles.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

use feature_api::config::FeatureApiConfig;
use feature_api::state::AppState;
use test_utils::{
    assert_position_approx_eq, cells_bundle, points_bundle, urls, wkt, MemoryBundle, MemoryOpener,
    CELLS_COLUMNS,
};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    opener: Arc<MemoryOpener>,
}

impl TestApp {
    fn new(opener: MemoryOpener) -> Self {
        Self::with_config(opener, |_| {})
    }

    fn with_config(opener: MemoryOpener, configure: impl FnOnce(&mut FeatureApiConfig)) -> Self {
        let mut config = FeatureApiConfig::default();
        configure(&mut config);

        let opener = Arc::new(opener);
        let state = Arc::new(AppState::with_opener(config, opener.clone()));
        Self {
            router: feature_api::router(state.clone()),
            state,
            opener,
        }
    }

    fn bundle(&self) -> &MemoryBundle {
        self.opener.bundle().expect("opener has a bundle")
    }

    async fn request(&self, method: Method, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        self.request(Method::GET, uri).await
    }
}

/// Percent-encode a query value.
fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

fn features_uri(url: &str, extra: &str) -> String {
    format!("/api/features?url={}{}", encode(url), extra)
}

fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).expect("body is JSON")
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));

    for uri in ["/api/features", "/api/features?url=", "/api/features?table=cells"] {
        let (status, _, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(json(&body)["error"].as_str().unwrap().contains("url"));
    }
    assert_eq!(app.opener.opens(), 0);
}

#[tokio::test]
async fn test_post_is_method_not_allowed() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
        let (status, headers, body) = app
            .request(method.clone(), &features_uri(urls::HTTPS_BUNDLE, ""))
            .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_eq!(headers[header::ALLOW], "GET");
        // HEAD responses carry no body
        if method != Method::HEAD {
            assert!(json(&body)["error"].as_str().unwrap().contains(method.as_str()));
        }
    }
    assert_eq!(app.opener.opens(), 0);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));

    let uri = format!(
        "/api/features?url={}&url={}",
        encode(urls::HTTPS_BUNDLE),
        encode(urls::HTTP_BUNDLE)
    );
    let (status, headers, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(json(&body)["error"].as_str().unwrap().contains("url"));
    assert_eq!(app.opener.opens(), 0);
}

#[tokio::test]
async fn test_local_file_url_never_reads() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));

    for url in [urls::LOCAL_FILE, urls::RELATIVE, "ftp://example.org/a.zarr"] {
        let (status, _, body) = app.get(&features_uri(url, "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json(&body)["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid source URL"));
    }

    assert_eq!(app.opener.opens(), 0);
    assert_eq!(app.bundle().metadata_calls(), 0);
    assert_eq!(app.bundle().read_calls(), 0);
}

// ============================================================================
// Feature resolution
// ============================================================================

#[tokio::test]
async fn test_resolves_default_table() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));

    let (status, headers, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/geo+json");
    assert_eq!(headers["x-cache"], "MISS");

    let fc = json(&body);
    assert_eq!(fc["type"], "FeatureCollection");

    // Row 4 has garbage polygon text and is dropped; the columns stay complete
    let features = fc["features"].as_array().unwrap();
    assert_eq!(features.len(), 4);
    let columns: Vec<&str> = fc["columns"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(columns, CELLS_COLUMNS);

    let ids: Vec<&str> = features
        .iter()
        .filter_map(|f| f["properties"]["cell_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["c0", "c1", "c2", "c3"]);

    // Polygon rows keep their exact coordinates
    assert_eq!(features[0]["geometry"]["type"], "Polygon");
    assert_eq!(
        features[0]["geometry"]["coordinates"],
        serde_json::json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]])
    );
    assert_eq!(features[2]["geometry"]["coordinates"].as_array().unwrap().len(), 2);
    assert_eq!(features[2]["properties"]["polygon_wkt"], wkt::SQUARE_WITH_HOLE);

    // Row 3 has no polygon and falls back to a point
    assert_eq!(features[3]["geometry"]["type"], "Point");
    let coords: [f64; 2] = serde_json::from_value(features[3]["geometry"]["coordinates"].clone()).unwrap();
    assert_position_approx_eq!(coords, (3.5, 3.5), 1e-12);
    assert!(features[3]["properties"]["polygon_wkt"].is_null());

    // Properties keep table column order
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains(r#""properties":{"cell_id":"c0","x":0.5,"y":0.5,"area":1.0,"polygon_wkt""#));
}

#[tokio::test]
async fn test_explicit_table() {
    let bundle = points_bundle("spots", 3).with_table(
        "annotations",
        vec![
            ("x", test_utils::floats(&[10.0])),
            ("y", test_utils::floats(&[20.0])),
        ],
    );
    let app = TestApp::new(MemoryOpener::new(bundle));

    let (status, _, body) = app
        .get(&features_uri(urls::HTTPS_BUNDLE, "&table=spots"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["features"].as_array().unwrap().len(), 3);

    let (_, _, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "")).await;
    let fc = json(&body);
    assert_eq!(fc["features"][0]["geometry"]["coordinates"], serde_json::json!([10.0, 20.0]));
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let app = TestApp::with_config(MemoryOpener::new(points_bundle("spots", 50)), |config| {
        config.limits.max_limit = 20;
    });

    let (_, _, body) = app
        .get(&features_uri(urls::HTTPS_BUNDLE, "&limit=999999"))
        .await;
    assert_eq!(json(&body)["features"].as_array().unwrap().len(), 20);
    assert!(app.bundle().reads().iter().all(|(_, _, end)| *end <= 20));

    let (_, _, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "&limit=5")).await;
    assert_eq!(json(&body)["features"].as_array().unwrap().len(), 5);

    // Unusable limits mean the maximum
    let (_, _, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "&limit=-3")).await;
    assert_eq!(json(&body)["features"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_small_table_returns_every_row() {
    let app = TestApp::new(MemoryOpener::new(points_bundle("spots", 7)));

    let (_, _, body) = app
        .get(&features_uri(urls::HTTPS_BUNDLE, "&limit=100"))
        .await;
    let fc = json(&body);
    assert_eq!(fc["features"].as_array().unwrap().len(), 7);
    assert_eq!(fc["columns"], serde_json::json!(["x", "y"]));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unreachable_bundle_is_upstream_error() {
    let app = TestApp::new(MemoryOpener::unreachable());

    let (status, _, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Upstream fetch failed"));
}

#[tokio::test]
async fn test_bundle_without_tables_is_structure_error() {
    let bundle = MemoryBundle::new().with_array("images/raw/0", vec![]);
    let app = TestApp::new(MemoryOpener::new(bundle));

    let (status, _, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid bundle structure"));
}

#[tokio::test]
async fn test_failing_column_aborts_and_is_not_cached() {
    let bundle = cells_bundle().with_failing_array("tables/cells/obs/area");
    let app = TestApp::new(MemoryOpener::new(bundle));

    for _ in 0..2 {
        let (status, _, body) = app.get(&features_uri(urls::HTTPS_BUNDLE, "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json(&body).get("features").is_none());
    }
    assert_eq!(app.opener.opens(), 2);
    assert_eq!(app.state.cache.stats().snapshot().entries, 0);
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_second_request_is_cached() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));
    let uri = features_uri(urls::HTTPS_BUNDLE, "&limit=3");

    let (_, first_headers, first) = app.get(&uri).await;
    let metadata_calls = app.bundle().metadata_calls();
    let read_calls = app.bundle().read_calls();

    let (status, headers, second) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_headers["x-cache"], "MISS");
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(first, second);

    assert_eq!(app.opener.opens(), 1);
    assert_eq!(app.bundle().metadata_calls(), metadata_calls);
    assert_eq!(app.bundle().read_calls(), read_calls);
}

#[tokio::test]
async fn test_cache_key_includes_limit_and_table() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));

    app.get(&features_uri(urls::HTTPS_BUNDLE, "&limit=3")).await;
    let (_, headers, _) = app.get(&features_uri(urls::HTTPS_BUNDLE, "&limit=4")).await;
    assert_eq!(headers["x-cache"], "MISS");

    let (_, headers, _) = app
        .get(&features_uri(urls::HTTPS_BUNDLE, "&limit=3&table=cells"))
        .await;
    assert_eq!(headers["x-cache"], "MISS");

    // Same effective limit, same entry
    let (_, headers, _) = app
        .get(&features_uri(urls::HTTPS_BUNDLE, "&limit=3&table="))
        .await;
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(app.opener.opens(), 3);
}

#[tokio::test]
async fn test_zero_ttl_disables_reuse() {
    let app = TestApp::with_config(MemoryOpener::new(cells_bundle()), |config| {
        config.cache.ttl_secs = 0;
    });
    let uri = features_uri(urls::HTTPS_BUNDLE, "");

    app.get(&uri).await;
    let (_, headers, _) = app.get(&uri).await;
    assert_eq!(headers["x-cache"], "MISS");
    assert_eq!(app.opener.opens(), 2);
}

#[tokio::test]
async fn test_abandoned_request_still_fills_cache() {
    let bundle = cells_bundle().with_delay(Duration::from_millis(20));
    let app = TestApp::new(MemoryOpener::new(bundle));
    let uri = features_uri(urls::HTTPS_BUNDLE, "");

    // The client gives up long before the pipeline finishes
    let abandoned = tokio::time::timeout(Duration::from_millis(5), app.get(&uri)).await;
    assert!(abandoned.is_err());

    let mut cached = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if app.state.cache.stats().snapshot().entries == 1 {
            cached = true;
            break;
        }
    }
    assert!(cached, "pipeline result never reached the cache");

    let (_, headers, _) = app.get(&uri).await;
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(app.opener.opens(), 1);
}

// ============================================================================
// Service endpoints
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(MemoryOpener::unreachable());

    let (status, _, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = TestApp::new(MemoryOpener::unreachable());

    let (status, headers, _) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_cache_stats_endpoint() {
    let app = TestApp::new(MemoryOpener::new(cells_bundle()));
    let uri = features_uri(urls::HTTPS_BUNDLE, "");

    app.get(&uri).await;
    app.get(&uri).await;

    let (status, _, body) = app.get("/api/cache/stats").await;
    assert_eq!(status, StatusCode::OK);

    let stats = json(&body);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["ttl_secs"], 60);
}
