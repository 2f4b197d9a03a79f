// Lookup resolver — one reverse-geocode per result item, deduplicated and cancellable.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::traits::AnalysisBackend;
use crate::display::DisplaySink;
use crate::engine::cache::{CacheKey, LocationCache};
use crate::engine::session::{SessionGate, SessionId};

/// Addressable unit of display for one lookup: the item identity plus its
/// 0-based rank in the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupSlot {
    pub identity: u64,
    pub rank: usize,
}

/// Resolves addresses for result items, one network call per slot at most.
///
/// The in-flight registry holds a cancellation handle per slot exactly while
/// a request is outstanding; the entry is removed on completion, error, or
/// cancellation.
pub struct LookupResolver {
    backend: Arc<dyn AnalysisBackend>,
    cache: Arc<LocationCache>,
    gate: Arc<SessionGate>,
    display: Arc<dyn DisplaySink>,
    inflight: Mutex<HashMap<LookupSlot, CancellationToken>>,
}

impl LookupResolver {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        cache: Arc<LocationCache>,
        gate: Arc<SessionGate>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            backend,
            cache,
            gate,
            display,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the address for one result item, fire-and-forget.
    ///
    /// Served from cache when possible; otherwise at most one request per
    /// slot is started, so re-renders of the same item never duplicate a
    /// call that is already outstanding.
    pub fn resolve(
        self: &Arc<Self>,
        lat: f64,
        lon: f64,
        identity: u64,
        rank: usize,
        session: SessionId,
    ) {
        let key = CacheKey::new(lat, lon, identity);

        if let Some(info) = self.cache.get(&key) {
            self.display.location_resolved(identity, &info);
            self.display.marker_resolved(identity, &info);
            return;
        }

        let slot = LookupSlot { identity, rank };
        let token = CancellationToken::new();
        {
            let mut inflight = self.inflight.lock();
            // A request is already outstanding for this slot; its completion
            // will populate the cache and update the display.
            if inflight.contains_key(&slot) {
                return;
            }
            inflight.insert(slot, token.clone());
        }

        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            resolver
                .lookup_task(key, lat, lon, slot, session, token)
                .await;

            // Registry cleanup happens on every path out of the task.
            resolver.inflight.lock().remove(&slot);
        });
    }

    async fn lookup_task(
        &self,
        key: CacheKey,
        lat: f64,
        lon: f64,
        slot: LookupSlot,
        session: SessionId,
        token: CancellationToken,
    ) {
        let result = tokio::select! {
            r = self.backend.fetch_location(lat, lon, slot.rank) => r,
            _ = token.cancelled() => {
                debug!("lookup cancelled slot=({}, {})", slot.identity, slot.rank);
                return;
            }
        };

        match result {
            Ok(info) => {
                // The cache is keyed by coordinate+identity, not by session,
                // so the write is sound even for a stale response.
                self.cache.insert(key, info.clone());

                if self.gate.is_current(&session) {
                    self.display.location_resolved(slot.identity, &info);
                    self.display.marker_resolved(slot.identity, &info);
                } else {
                    debug!(
                        "stale lookup discarded slot=({}, {}) session={}",
                        slot.identity, slot.rank, session
                    );
                }
            }
            // Lookup failures are cosmetic; the slot keeps its last state.
            Err(e) => {
                debug!(
                    "lookup failed slot=({}, {}): {}",
                    slot.identity, slot.rank, e
                );
            }
        }
    }

    /// Cancel every outstanding lookup. Called by the supervisor on
    /// supersession and teardown, before the old session is discarded.
    pub fn cancel_all(&self) {
        let inflight = self.inflight.lock();
        for token in inflight.values() {
            token.cancel();
        }
    }

    /// Number of outstanding lookups.
    pub fn inflight_count(&self) -> usize {
        self.inflight.lock().len()
    }
}
