//! Integration tests against mock upstream services
//!
//! Covers proxy → remote fallback, Nominatim lookups through the cache,
//! the courtesy rate limit, preview provider fallback and the full map
//! pipeline.

mod helpers;

use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
use gtrk_common::db::{init_database, init_memory_database};
use gtrk_map::error::FetchError;
use gtrk_map::fetcher::{ArtistCatalog, DataFetcher, Endpoint, Source};
use gtrk_map::geocode::{CachedGeocoder, Geocoder, NominatimClient};
use gtrk_map::pipeline::build_map;
use gtrk_map::preview::PreviewResolver;
use helpers::{broken_upstream, spawn, upstream, Hits};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fetcher(base: &str) -> DataFetcher {
    DataFetcher::new(base, format!("{}/api", base), TIMEOUT).unwrap()
}

// =============================================================================
// Data fetching
// =============================================================================

#[tokio::test]
async fn test_proxy_serves_without_touching_remote() {
    let (proxy_hits, remote_hits) = (Hits::default(), Hits::default());
    let base = spawn(upstream(true, proxy_hits.clone(), remote_hits.clone())).await;

    let fetched = fetcher(&base)
        .fetch_json_with_source::<Value>(Endpoint::Artists)
        .await
        .unwrap();

    assert_eq!(fetched.source, Source::Proxy);
    assert_eq!(fetched.value.as_array().unwrap().len(), 3);
    assert_eq!(proxy_hits.count(), 1);
    assert_eq!(remote_hits.count(), 0);
}

#[tokio::test]
async fn test_proxy_failure_falls_back_to_remote_once() {
    let (proxy_hits, remote_hits) = (Hits::default(), Hits::default());
    let base = spawn(upstream(false, proxy_hits.clone(), remote_hits.clone())).await;

    let fetched = fetcher(&base)
        .fetch_json_with_source::<Value>(Endpoint::Relation)
        .await
        .unwrap();

    assert_eq!(fetched.source, Source::Remote);
    assert_eq!(proxy_hits.count(), 1);
    assert_eq!(remote_hits.count(), 1);
}

#[tokio::test]
async fn test_both_sources_failing_is_an_error() {
    let base = spawn(broken_upstream()).await;

    let err = fetcher(&base).artists().await.unwrap_err();
    match err {
        FetchError::BothSourcesFailed { proxy, remote } => {
            assert!(matches!(*proxy, FetchError::Status { status: 503, .. }));
            assert!(matches!(*remote, FetchError::Status { status: 503, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_proxy_falls_back_to_remote() {
    let remote_hits = Hits::default();
    let remote = spawn(upstream(true, Hits::default(), remote_hits.clone())).await;

    // bind then drop to get a port nothing listens on
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let fetcher =
        DataFetcher::new(format!("http://{}", closed), format!("{}/api", remote), TIMEOUT).unwrap();

    let fetched = fetcher
        .fetch_json_with_source::<Value>(Endpoint::Artists)
        .await
        .unwrap();
    assert_eq!(fetched.source, Source::Remote);
    assert_eq!(remote_hits.count(), 1);
}

#[tokio::test]
async fn test_undecodable_proxy_body_falls_back_to_remote() {
    let remote_hits = Hits::default();
    let remote = spawn(upstream(true, Hits::default(), remote_hits.clone())).await;
    let proxy = spawn(Router::new().route(
        "/api/artists-proxy",
        get(|| async { "<html>maintenance</html>" }),
    ))
    .await;
    let fetcher = DataFetcher::new(proxy, format!("{}/api", remote), TIMEOUT).unwrap();

    let fetched = fetcher
        .fetch_json_with_source::<Value>(Endpoint::Artists)
        .await
        .unwrap();
    assert_eq!(fetched.source, Source::Remote);
    assert_eq!(fetched.value.as_array().unwrap().len(), 3);
    assert_eq!(remote_hits.count(), 1);
}

#[tokio::test]
async fn test_fetch_sends_json_no_store_headers() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
    let log = seen.clone();
    let base = spawn(Router::new().route(
        "/api/artists-proxy",
        get(move |headers: HeaderMap| {
            let log = log.clone();
            async move {
                let header = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                log.lock()
                    .unwrap()
                    .push((header("accept"), header("cache-control")));
                Json(helpers::artists_json())
            }
        }),
    ))
    .await;

    fetcher(&base).artists().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "application/json");
    assert_eq!(seen[0].1, "no-store");
}

#[tokio::test]
async fn test_catalog_loads_once() {
    let (proxy_hits, remote_hits) = (Hits::default(), Hits::default());
    let base = spawn(upstream(true, proxy_hits.clone(), remote_hits)).await;
    let catalog = ArtistCatalog::new(Arc::new(fetcher(&base)));

    assert_eq!(catalog.ensure_loaded().await.unwrap().len(), 3);
    assert_eq!(catalog.find(2).await.unwrap().unwrap().name, "Pink Floyd");
    assert!(catalog.find(42).await.unwrap().is_none());
    assert_eq!(proxy_hits.count(), 1);
}

// =============================================================================
// Geocoding
// =============================================================================

#[derive(Clone, Default)]
struct NominatimLog {
    hits: Hits,
    languages: Arc<Mutex<Vec<String>>>,
}

fn nominatim(log: NominatimLog) -> Router {
    Router::new().route(
        "/search",
        get(
            move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let log = log.clone();
                async move {
                    log.hits.bump();
                    if let Some(lang) = headers.get("accept-language") {
                        log.languages
                            .lock()
                            .unwrap()
                            .push(lang.to_str().unwrap().to_string());
                    }
                    assert_eq!(params.get("format").map(String::as_str), Some("json"));

                    let q = params.get("q").cloned().unwrap_or_default().to_lowercase();
                    let body = if q.starts_with("london") {
                        json!([
                            {"lat": "51.5074", "lon": "-0.1278", "display_name": "London"},
                            {"lat": "42.98", "lon": "-81.24", "display_name": "London, Ontario"}
                        ])
                    } else if q.starts_with("paris") {
                        json!([{"lat": "48.8566", "lon": "2.3522"}])
                    } else {
                        json!([])
                    };
                    Json(body)
                }
            },
        ),
    )
}

fn nominatim_client(base: &str, min_interval: Duration) -> NominatimClient {
    NominatimClient::new(base, "fr", min_interval, TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_nominatim_takes_first_result() {
    let log = NominatimLog::default();
    let base = spawn(nominatim(log.clone())).await;
    let client = nominatim_client(&base, Duration::ZERO);

    let point = client.lookup("london-uk").await.unwrap().unwrap();
    assert!((point.lat - 51.5074).abs() < 1e-9);
    assert!((point.lon + 0.1278).abs() < 1e-9);

    assert!(client.lookup("atlantis-ocean").await.unwrap().is_none());
    assert_eq!(log.languages.lock().unwrap().as_slice(), ["fr", "fr"]);
}

#[tokio::test]
async fn test_cache_hit_skips_network() {
    let log = NominatimLog::default();
    let base = spawn(nominatim(log.clone())).await;
    let pool = init_memory_database().await.unwrap();
    let geocoder = CachedGeocoder::new(nominatim_client(&base, Duration::ZERO), pool);

    let first = geocoder.resolve("Paris-France").await.unwrap();
    assert!(!first.from_cache);
    assert!(first.point.is_some());

    let second = geocoder.resolve("paris-france").await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.point, first.point);

    assert_eq!(log.hits.count(), 1);
    assert_eq!(geocoder.cached_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_result_is_not_cached() {
    let log = NominatimLog::default();
    let base = spawn(nominatim(log.clone())).await;
    let pool = init_memory_database().await.unwrap();
    let geocoder = CachedGeocoder::new(nominatim_client(&base, Duration::ZERO), pool);

    assert!(geocoder.resolve("atlantis-ocean").await.unwrap().point.is_none());
    assert!(geocoder.resolve("atlantis-ocean").await.unwrap().point.is_none());

    assert_eq!(log.hits.count(), 2);
    assert_eq!(geocoder.cached_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let log = NominatimLog::default();
    let base = spawn(nominatim(log.clone())).await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("gtrk.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        let geocoder = CachedGeocoder::new(nominatim_client(&base, Duration::ZERO), pool.clone());
        assert!(!geocoder.resolve("london-uk").await.unwrap().from_cache);
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let geocoder = CachedGeocoder::new(nominatim_client(&base, Duration::ZERO), pool);
    assert!(geocoder.resolve("London-UK").await.unwrap().from_cache);
    assert_eq!(log.hits.count(), 1);

    assert_eq!(geocoder.clear_cache().await.unwrap(), 1);
    assert!(!geocoder.resolve("london-uk").await.unwrap().from_cache);
    assert_eq!(log.hits.count(), 2);
}

#[tokio::test]
async fn test_rate_limit_spaces_network_lookups() {
    let base = spawn(nominatim(NominatimLog::default())).await;
    let client = nominatim_client(&base, Duration::from_millis(150));

    let start = Instant::now();
    client.lookup("london-uk").await.unwrap();
    client.lookup("paris-france").await.unwrap();
    client.lookup("atlantis-ocean").await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_geocoder_status_error() {
    let base = spawn(broken_upstream()).await;
    let client = nominatim_client(&base, Duration::ZERO);

    let err = client.lookup("london-uk").await.unwrap_err();
    assert!(matches!(err, gtrk_map::geocode::GeocodeError::Status(503)));
}

// =============================================================================
// Map pipeline
// =============================================================================

#[tokio::test]
async fn test_build_map_end_to_end() {
    let base = spawn(upstream(true, Hits::default(), Hits::default())).await;
    let geo_log = NominatimLog::default();
    let geo_base = spawn(nominatim(geo_log.clone())).await;

    let catalog = ArtistCatalog::new(Arc::new(fetcher(&base)));
    let pool = init_memory_database().await.unwrap();
    let geocoder = CachedGeocoder::new(nominatim_client(&geo_base, Duration::ZERO), pool);

    let view = build_map(&catalog, &geocoder, None).await.unwrap();

    // london, paris placed; atlantis fails
    assert_eq!(view.success, 2);
    assert_eq!(view.failures, 1);
    assert_eq!(view.status, "Markers ready: 2. Failures: 1.");
    assert!(view.bounds.is_some());

    let london = view.markers.iter().find(|m| m.location == "london-uk").unwrap();
    assert_eq!(london.label, "London, Uk");
    assert_eq!(london.artists.len(), 2);
    assert_eq!(london.dates.len(), 3);

    // second run is served from the cache except the miss
    let again = build_map(&catalog, &geocoder, None).await.unwrap();
    assert_eq!(again.success, 2);
    assert_eq!(geo_log.hits.count(), 4);
}

#[tokio::test]
async fn test_build_map_limit() {
    let base = spawn(upstream(true, Hits::default(), Hits::default())).await;
    let geo_base = spawn(nominatim(NominatimLog::default())).await;

    let catalog = ArtistCatalog::new(Arc::new(fetcher(&base)));
    let pool = init_memory_database().await.unwrap();
    let geocoder = CachedGeocoder::new(nominatim_client(&geo_base, Duration::ZERO), pool);

    let view = build_map(&catalog, &geocoder, Some(1)).await.unwrap();
    assert_eq!(view.success + view.failures, 1);
}

#[tokio::test]
async fn test_build_map_fails_when_data_unavailable() {
    let base = spawn(broken_upstream()).await;
    let geo_base = spawn(nominatim(NominatimLog::default())).await;

    let catalog = ArtistCatalog::new(Arc::new(fetcher(&base)));
    let pool = init_memory_database().await.unwrap();
    let geocoder = CachedGeocoder::new(nominatim_client(&geo_base, Duration::ZERO), pool);

    assert!(build_map(&catalog, &geocoder, None).await.is_err());
}

// =============================================================================
// Preview lookup
// =============================================================================

fn preview_providers(itunes: Option<Value>, deezer: Value) -> Router {
    Router::new()
        .route(
            "/itunes/search",
            get(move || {
                let itunes = itunes.clone();
                async move { itunes.map(Json).ok_or(axum::http::StatusCode::BAD_GATEWAY) }
            }),
        )
        .route(
            "/deezer/search",
            get(move || {
                let deezer = deezer.clone();
                async move { Json(deezer) }
            }),
        )
}

async fn resolver(app: Router) -> PreviewResolver {
    let base = spawn(app).await;
    PreviewResolver::with_bases(format!("{}/itunes", base), format!("{}/deezer", base), TIMEOUT)
        .unwrap()
}

#[tokio::test]
async fn test_preview_prefers_itunes() {
    let r = resolver(preview_providers(
        Some(json!({"resultCount": 1, "results": [{"previewUrl": "http://audio.test/q.m4a"}]})),
        json!({"data": [{"preview": "https://deezer.test/q.mp3"}]}),
    ))
    .await;

    assert_eq!(r.resolve("Queen").await.as_deref(), Some("https://audio.test/q.m4a"));
}

#[tokio::test]
async fn test_preview_falls_back_to_deezer() {
    let r = resolver(preview_providers(
        Some(json!({"resultCount": 0, "results": []})),
        json!({"data": [{"preview": "http://deezer.test/q.mp3"}]}),
    ))
    .await;
    assert_eq!(r.resolve("Queen").await.as_deref(), Some("https://deezer.test/q.mp3"));

    let r = resolver(preview_providers(
        None,
        json!({"data": [{"preview": "https://deezer.test/q.mp3"}]}),
    ))
    .await;
    assert_eq!(r.resolve("Queen").await.as_deref(), Some("https://deezer.test/q.mp3"));
}

#[tokio::test]
async fn test_preview_none_when_no_provider_has_one() {
    let r = resolver(preview_providers(None, json!({"data": []}))).await;
    assert!(r.resolve("Nobody").await.is_none());
}

#[tokio::test]
async fn test_preview_uses_configured_fallback_last() {
    let fallback = Some("https://cdn.test/sample.mp3".to_string());

    let r = resolver(preview_providers(None, json!({"data": []})))
        .await
        .with_fallback(fallback.clone());
    assert_eq!(r.resolve("Nobody").await, fallback);

    let r = resolver(preview_providers(
        None,
        json!({"data": [{"preview": "https://deezer.test/q.mp3"}]}),
    ))
    .await
    .with_fallback(fallback);
    assert_eq!(r.resolve("Queen").await.as_deref(), Some("https://deezer.test/q.mp3"));
}
