// Result waiter — polls the results endpoint until it leaves "pending".

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::traits::AnalysisBackend;
use crate::backend::types::{JobId, ResultsPoll, ResultsPayload};
use crate::error::{BackendError, EngineError};

/// Awaits the terminal outcome of one analysis job.
pub struct ResultWaiter {
    backend: Arc<dyn AnalysisBackend>,
    poll_interval: Duration,
}

impl ResultWaiter {
    pub fn new(backend: Arc<dyn AnalysisBackend>, poll_interval: Duration) -> Self {
        Self {
            backend,
            poll_interval,
        }
    }

    /// Poll until the job settles. Produces exactly one outcome:
    /// the payload on success, the server's message on rejection, a transport
    /// error on a failed poll, or `Cancelled` when `cancel` fires first.
    ///
    /// No upper bound on the number of polls is imposed here; stopping an
    /// analysis that never completes is the caller's cancel action.
    pub async fn await_results(
        &self,
        job: &JobId,
        cancel: &CancellationToken,
    ) -> Result<ResultsPayload, EngineError> {
        loop {
            let poll = tokio::select! {
                r = self.backend.fetch_results(job) => r,
                _ = cancel.cancelled() => {
                    debug!("result wait cancelled job={}", job);
                    return Err(EngineError::Cancelled);
                }
            };

            match poll {
                Ok(ResultsPoll::Ready(payload)) => {
                    debug!(
                        "results ready job={} items={}",
                        job,
                        payload.results.len()
                    );
                    return Ok(payload);
                }
                Ok(ResultsPoll::Pending) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = cancel.cancelled() => {
                            debug!("result wait cancelled job={}", job);
                            return Err(EngineError::Cancelled);
                        }
                    }
                }
                Err(BackendError::Rejected(message)) => {
                    return Err(EngineError::Analysis(message));
                }
                // A result poll that errors is terminal for the wait.
                Err(e) => return Err(EngineError::Backend(e)),
            }
        }
    }
}
