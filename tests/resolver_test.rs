use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, State};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;

use plonk_client_engine::backend::http_backend::HttpBackend;
use plonk_client_engine::backend::types::LocationInfo;
use plonk_client_engine::display::DisplaySink;
use plonk_client_engine::engine::cache::LocationCache;
use plonk_client_engine::engine::resolver::LookupResolver;
use plonk_client_engine::engine::session::{SessionGate, SessionId};

struct FakeGeocoder {
    calls: AtomicUsize,
    delay: Duration,
}

async fn location_handler(
    State(state): State<Arc<FakeGeocoder>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    let lat = body["lat"].as_f64().unwrap();
    let lon = body["lon"].as_f64().unwrap();
    Json(json!({
        "success": true,
        "location_info": {
            "full_address": format!("Address near {:.6}, {:.6}", lat, lon),
            "city": "Paris",
            "country": "France"
        },
        "result_index": body["result_index"]
    }))
}

async fn start_server(state: Arc<FakeGeocoder>) -> SocketAddr {
    let app = Router::new()
        .route("/get_location_details", post(location_handler))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Display that records every delivery for assertions.
#[derive(Default)]
struct RecordingDisplay {
    list: Mutex<Vec<(u64, String)>>,
    markers: Mutex<Vec<(u64, String)>>,
    finalizing: AtomicBool,
}

impl DisplaySink for RecordingDisplay {
    fn progress_update(&self, _current: u32, _total: u32) {}

    fn progress_finalizing(&self) {
        self.finalizing.store(true, Ordering::SeqCst);
    }

    fn location_resolved(&self, identity: u64, info: &LocationInfo) {
        self.list.lock().push((identity, info.full_address.clone()));
    }

    fn marker_resolved(&self, identity: u64, info: &LocationInfo) {
        self.markers
            .lock()
            .push((identity, info.full_address.clone()));
    }
}

struct Fixture {
    geocoder: Arc<FakeGeocoder>,
    display: Arc<RecordingDisplay>,
    gate: Arc<SessionGate>,
    cache: Arc<LocationCache>,
    resolver: Arc<LookupResolver>,
}

async fn fixture(delay: Duration) -> Fixture {
    let geocoder = Arc::new(FakeGeocoder {
        calls: AtomicUsize::new(0),
        delay,
    });
    let addr = start_server(geocoder.clone()).await;

    let backend = Arc::new(HttpBackend::new(format!("http://{}", addr)));
    let display = Arc::new(RecordingDisplay::default());
    let gate = Arc::new(SessionGate::new());
    let cache = Arc::new(LocationCache::new());
    let resolver = Arc::new(LookupResolver::new(
        backend,
        cache.clone(),
        gate.clone(),
        display.clone(),
    ));

    Fixture {
        geocoder,
        display,
        gate,
        cache,
        resolver,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let f = fixture(Duration::ZERO).await;
    let session = SessionId::generate();
    f.gate.set_current(session.clone());

    f.resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());
    wait_until(|| f.display.list.lock().len() == 1).await;
    assert_eq!(f.geocoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.cache.len(), 1);

    // Same coordinates and identity again: no network call, immediate delivery.
    f.resolver.resolve(48.8566, 2.3522, 1, 0, session);
    wait_until(|| f.display.list.lock().len() == 2).await;
    assert_eq!(f.geocoder.calls.load(Ordering::SeqCst), 1);

    // Both deliveries carry the same resolved value, to both targets.
    let list = f.display.list.lock();
    let markers = f.display.markers.lock();
    assert_eq!(list[0], list[1]);
    assert_eq!(markers.len(), 2);
    assert_eq!(list[0].1, markers[0].1);
}

#[tokio::test]
async fn test_concurrent_requests_deduplicated() {
    let f = fixture(Duration::from_millis(150)).await;
    let session = SessionId::generate();
    f.gate.set_current(session.clone());

    f.resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());
    f.resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());
    f.resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(f.resolver.inflight_count(), 1);

    wait_until(|| f.resolver.inflight_count() == 0).await;
    assert_eq!(f.geocoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.display.list.lock().len(), 1);

    // A later call site observes the same value through the cache.
    f.resolver.resolve(48.8566, 2.3522, 1, 0, session);
    wait_until(|| f.display.list.lock().len() == 2).await;
    assert_eq!(f.geocoder.calls.load(Ordering::SeqCst), 1);
    let list = f.display.list.lock();
    assert_eq!(list[0].1, list[1].1);
}

#[tokio::test]
async fn test_shared_coordinates_distinct_identities() {
    let f = fixture(Duration::ZERO).await;
    let session = SessionId::generate();
    f.gate.set_current(session.clone());

    // Two items at the same spot keep separate display slots.
    f.resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());
    f.resolver.resolve(48.8566, 2.3522, 2, 1, session);

    wait_until(|| f.display.list.lock().len() == 2).await;
    assert_eq!(f.geocoder.calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.cache.len(), 2);
}

#[tokio::test]
async fn test_superseded_session_writes_cache_but_not_display() {
    let f = fixture(Duration::from_millis(80)).await;
    let session_a = SessionId::generate();
    let session_b = SessionId::generate();
    f.gate.set_current(session_a.clone());

    f.resolver.resolve(48.8566, 2.3522, 1, 0, session_a);
    // Supersede while the lookup is still in flight.
    f.gate.set_current(session_b);

    wait_until(|| f.resolver.inflight_count() == 0).await;
    assert_eq!(f.geocoder.calls.load(Ordering::SeqCst), 1);

    // Cache write is sound regardless of session; display update is gated.
    assert_eq!(f.cache.len(), 1);
    assert!(f.display.list.lock().is_empty());
    assert!(f.display.markers.lock().is_empty());
}

#[tokio::test]
async fn test_cancel_all_clears_inflight_silently() {
    let f = fixture(Duration::from_millis(500)).await;
    let session = SessionId::generate();
    f.gate.set_current(session.clone());

    f.resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());
    f.resolver.resolve(51.5033, -0.1276, 2, 1, session);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(f.resolver.inflight_count(), 2);

    f.resolver.cancel_all();
    wait_until(|| f.resolver.inflight_count() == 0).await;

    // Nothing reached the display, nothing was cached.
    assert!(f.display.list.lock().is_empty());
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn test_lookup_failure_is_contained() {
    // Server that fails for one item and succeeds for another.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_handler = calls.clone();
    let app = Router::new().route(
        "/get_location_details",
        post(move |Json(body): Json<serde_json::Value>| {
            let calls = calls_handler.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if body["result_index"] == 0 {
                    Json(json!({"success": false, "error": "rate limited"}))
                } else {
                    Json(json!({
                        "success": true,
                        "location_info": {"full_address": "Westminster, London"}
                    }))
                }
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let backend = Arc::new(HttpBackend::new(format!("http://{}", addr)));
    let display = Arc::new(RecordingDisplay::default());
    let gate = Arc::new(SessionGate::new());
    let cache = Arc::new(LocationCache::new());
    let resolver = Arc::new(LookupResolver::new(
        backend,
        cache.clone(),
        gate.clone(),
        display.clone(),
    ));

    let session = SessionId::generate();
    gate.set_current(session.clone());

    resolver.resolve(48.8566, 2.3522, 1, 0, session.clone());
    resolver.resolve(51.5033, -0.1276, 2, 1, session);

    wait_until(|| resolver.inflight_count() == 0 && calls.load(Ordering::SeqCst) == 2).await;

    // The failed slot stays in its last state; the sibling still resolves.
    let list = display.list.lock();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0], (2, "Westminster, London".to_string()));
    assert_eq!(cache.len(), 1);
}
