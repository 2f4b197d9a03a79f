use async_trait::async_trait;

use super::types::{
    AnalysisRequest, JobId, LocationInfo, ProgressSnapshot, ResultsPoll,
};
use crate::error::BackendError;

/// The four collaborator endpoints, as one trait seam.
///
/// Callers cancel a request by racing the returned future against a
/// cancellation token and dropping it; implementations must tolerate
/// being dropped at any await point.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Start a job; returns the server-assigned job id.
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<JobId, BackendError>;

    /// Poll iteration progress for a job.
    async fn fetch_progress(&self, job: &JobId) -> Result<ProgressSnapshot, BackendError>;

    /// Poll for the terminal result set. `Pending` maps HTTP 202.
    async fn fetch_results(&self, job: &JobId) -> Result<ResultsPoll, BackendError>;

    /// Reverse-geocode one result item's coordinates.
    async fn fetch_location(
        &self,
        lat: f64,
        lon: f64,
        result_index: usize,
    ) -> Result<LocationInfo, BackendError>;
}
