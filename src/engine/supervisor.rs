// Session supervisor — starts analyses, supersedes prior ones, owns the gate.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::traits::AnalysisBackend;
use crate::backend::types::{AnalysisRequest, JobId, ResultsPayload};
use crate::config::EngineConfig;
use crate::display::DisplaySink;
use crate::engine::cache::LocationCache;
use crate::engine::progress::ProgressMonitor;
use crate::engine::resolver::LookupResolver;
use crate::engine::session::{SessionGate, SessionId, SessionStatus};
use crate::engine::waiter::ResultWaiter;
use crate::error::{BackendError, EngineError};

struct ActiveSession {
    id: SessionId,
    job: Option<JobId>,
    cancel: CancellationToken,
    status: SessionStatus,
}

/// Owns the identity of the current analysis and the lifecycle around it.
///
/// Exactly one session is current at any time; starting a new one cancels the
/// previous session's outbound start call, progress polling, result wait, and
/// in-flight lookups before any of the new session's requests go out.
pub struct Supervisor {
    backend: Arc<dyn AnalysisBackend>,
    display: Arc<dyn DisplaySink>,
    gate: Arc<SessionGate>,
    resolver: Arc<LookupResolver>,
    cache: Arc<LocationCache>,
    config: EngineConfig,
    current: Mutex<Option<ActiveSession>>,
}

impl Supervisor {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        display: Arc<dyn DisplaySink>,
        config: EngineConfig,
    ) -> Self {
        let gate = Arc::new(SessionGate::new());
        let cache = Arc::new(LocationCache::new());
        let resolver = Arc::new(LookupResolver::new(
            backend.clone(),
            cache.clone(),
            gate.clone(),
            display.clone(),
        ));
        Self {
            backend,
            display,
            gate,
            resolver,
            cache,
            config,
            current: Mutex::new(None),
        }
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub fn resolver(&self) -> &Arc<LookupResolver> {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    /// Whether the given session is still the current one.
    pub fn is_current(&self, id: &SessionId) -> bool {
        self.gate.is_current(id)
    }

    /// Start a new analysis, superseding any prior session.
    ///
    /// On success the session is `Running` and its id is returned. On failure
    /// the session is `Failed` and the error surfaces once; there is no retry
    /// here, the caller may simply invoke again.
    pub async fn start_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<SessionId, EngineError> {
        let (id, cancel) = self.supersede_and_allocate();
        info!("session {} starting", id);

        let started = tokio::select! {
            r = self.backend.start_analysis(request) => r,
            // A newer start cancelled us while the call was in flight.
            _ = cancel.cancelled() => return Err(EngineError::Superseded),
        };

        match started {
            Ok(job) => {
                let mut current = self.current.lock();
                match current.as_mut() {
                    Some(active) if active.id == id => {
                        active.job = Some(job.clone());
                        active.status = SessionStatus::Running;
                    }
                    // Superseded between response and bookkeeping.
                    _ => return Err(EngineError::Superseded),
                }
                info!("session {} running job={}", id, job);
                Ok(id)
            }
            Err(e) => {
                self.update_status(&id, SessionStatus::Failed);
                Err(match e {
                    BackendError::Rejected(message) => EngineError::Analysis(message),
                    other => EngineError::Backend(other),
                })
            }
        }
    }

    /// Run one full analysis lifecycle: start, monitor progress, await the
    /// result set, and kick off one address lookup per result item.
    ///
    /// The returned payload includes the opaque test-mode passthrough for the
    /// caller's own rendering.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<ResultsPayload, EngineError> {
        let iterative = request.is_iterative();
        let id = self.start_analysis(&request).await?;
        let (job, cancel) = self
            .session_handles(&id)
            .ok_or(EngineError::Superseded)?;

        // Progress polling only pays off with more than one planned
        // iteration; otherwise the progress text is static.
        let monitor_cancel = cancel.child_token();
        if iterative {
            let monitor = ProgressMonitor::new(
                self.backend.clone(),
                self.display.clone(),
                self.gate.clone(),
                Duration::from_millis(self.config.progress_poll_interval_ms),
            );
            monitor.spawn(id.clone(), job.clone(), monitor_cancel.clone());
        }

        let waiter = ResultWaiter::new(
            self.backend.clone(),
            Duration::from_millis(self.config.result_poll_interval_ms),
        );
        let outcome = waiter.await_results(&job, &cancel).await;

        // Cleanup path: progress polling stops regardless of outcome.
        monitor_cancel.cancel();

        match outcome {
            Ok(payload) => {
                if !self.gate.is_current(&id) {
                    return Err(EngineError::Superseded);
                }
                self.update_status(&id, SessionStatus::Completed);

                for (rank, item) in payload.results.iter().enumerate() {
                    self.resolver
                        .resolve(item.latitude, item.longitude, item.id, rank, id.clone());
                }
                Ok(payload)
            }
            Err(e) => {
                if !e.is_silent() {
                    self.update_status(&id, SessionStatus::Failed);
                }
                Err(e)
            }
        }
    }

    /// Cancel the current session: the hide/cleanup path. Stops the start
    /// call, progress polling, and result wait, and cancels every in-flight
    /// lookup.
    pub fn cancel_current(&self) {
        {
            let mut current = self.current.lock();
            if let Some(active) = current.as_mut() {
                debug!("session {} cancelled", active.id);
                active.cancel.cancel();
                active.status = SessionStatus::Superseded;
            }
        }
        self.resolver.cancel_all();
        self.gate.clear();
    }

    /// Status of the session with the given id, if it is still tracked.
    pub fn status(&self, id: &SessionId) -> Option<SessionStatus> {
        let current = self.current.lock();
        current
            .as_ref()
            .filter(|active| &active.id == id)
            .map(|active| active.status)
    }

    /// Supersede the previous session (cancel its work) and register a fresh
    /// one as current, before any new request goes out.
    fn supersede_and_allocate(&self) -> (SessionId, CancellationToken) {
        let mut current = self.current.lock();
        if let Some(prev) = current.as_mut() {
            debug!("session {} superseded", prev.id);
            prev.cancel.cancel();
            prev.status = SessionStatus::Superseded;
        }
        self.resolver.cancel_all();

        let id = SessionId::generate();
        let cancel = CancellationToken::new();
        self.gate.set_current(id.clone());
        *current = Some(ActiveSession {
            id: id.clone(),
            job: None,
            cancel: cancel.clone(),
            status: SessionStatus::Starting,
        });
        (id, cancel)
    }

    fn session_handles(&self, id: &SessionId) -> Option<(JobId, CancellationToken)> {
        let current = self.current.lock();
        current
            .as_ref()
            .filter(|active| &active.id == id)
            .and_then(|active| {
                active
                    .job
                    .clone()
                    .map(|job| (job, active.cancel.clone()))
            })
    }

    fn update_status(&self, id: &SessionId, status: SessionStatus) {
        let mut current = self.current.lock();
        if let Some(active) = current.as_mut() {
            if &active.id == id {
                active.status = status;
            }
        }
    }
}
