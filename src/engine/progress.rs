// Progress monitor — polls iteration progress for one session until terminal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::traits::AnalysisBackend;
use crate::backend::types::{JobId, ProgressStatus};
use crate::display::DisplaySink;
use crate::engine::session::{SessionGate, SessionId};

/// Polls the progress endpoint once per interval and pushes iteration counts
/// to the display. Spawned only for iterative analyses with more than one
/// planned iteration; otherwise the progress text stays static and no monitor
/// exists.
pub struct ProgressMonitor {
    backend: Arc<dyn AnalysisBackend>,
    display: Arc<dyn DisplaySink>,
    gate: Arc<SessionGate>,
    poll_interval: Duration,
}

impl ProgressMonitor {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        display: Arc<dyn DisplaySink>,
        gate: Arc<SessionGate>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            display,
            gate,
            poll_interval,
        }
    }

    /// Start polling in the background. The returned handle is informational;
    /// the loop stops on terminal status or when `cancel` fires, whichever
    /// comes first.
    pub fn spawn(
        self,
        session: SessionId,
        job: JobId,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(session, job, cancel).await })
    }

    async fn run(self, session: SessionId, job: JobId, cancel: CancellationToken) {
        // The first interval tick completes immediately, so the initial status
        // is not delayed by a full poll period.
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = tokio::select! {
                r = self.backend.fetch_progress(&job) => r,
                _ = cancel.cancelled() => break,
            };

            match snapshot {
                Ok(snap) => {
                    // A snapshot that lands after supersession is stale.
                    if !self.gate.is_current(&session) {
                        break;
                    }
                    match snap.status {
                        ProgressStatus::Running => {
                            self.display.progress_update(snap.current, snap.total);
                        }
                        ProgressStatus::Completed => {
                            self.display.progress_finalizing();
                            break;
                        }
                        // starting / error / unknown: the waiter is the source
                        // of truth for failure, keep polling.
                        _ => {}
                    }
                }
                Err(e) => {
                    warn!("progress poll failed for job {}: {}", job, e);
                }
            }
        }

        debug!("progress monitor stopped job={}", job);
    }
}
