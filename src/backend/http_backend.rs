use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use super::traits::AnalysisBackend;
use super::types::{
    AnalysisRequest, JobId, LocationDetailsRequest, LocationDetailsResponse, LocationInfo,
    ProgressSnapshot, ResultsPoll, ResultsPayload, StartResponse,
};
use crate::error::BackendError;

/// HTTP implementation of [`AnalysisBackend`] over one shared client.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a JSON body, mapping decode failures on non-success statuses
    /// to a status error rather than a transport error.
    async fn decode_json<T: serde::de::DeserializeOwned>(
        resp: Response,
    ) -> Result<T, BackendError> {
        let status = resp.status();
        match resp.json::<T>().await {
            Ok(body) => Ok(body),
            Err(e) if !status.is_success() => {
                warn!("request failed status={} ({})", status.as_u16(), e);
                Err(BackendError::Status(status.as_u16()))
            }
            Err(e) => Err(BackendError::Transport(e)),
        }
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<JobId, BackendError> {
        let resp = self
            .client
            .post(self.endpoint("/start_analysis"))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body: StartResponse = Self::decode_json(resp).await?;

        if !body.success {
            let message = body
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!("start_analysis rejected: {}", message);
            return Err(BackendError::Rejected(message));
        }

        let id = body
            .analysis_id
            .ok_or_else(|| BackendError::Rejected("missing analysis_id".to_string()))?;
        debug!("analysis started job={}", id);
        Ok(JobId(id))
    }

    async fn fetch_progress(&self, job: &JobId) -> Result<ProgressSnapshot, BackendError> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/get_progress/{}", job)))
            .send()
            .await?;
        Self::decode_json(resp).await
    }

    async fn fetch_results(&self, job: &JobId) -> Result<ResultsPoll, BackendError> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/get_results/{}", job)))
            .send()
            .await?;

        // 202 is the expected "not ready yet" signal, not an error.
        if resp.status() == StatusCode::ACCEPTED {
            return Ok(ResultsPoll::Pending);
        }

        let status = resp.status();
        let payload: ResultsPayload = Self::decode_json(resp).await?;

        if !payload.success {
            let message = payload
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(BackendError::Rejected(message));
        }

        Ok(ResultsPoll::Ready(payload))
    }

    async fn fetch_location(
        &self,
        lat: f64,
        lon: f64,
        result_index: usize,
    ) -> Result<LocationInfo, BackendError> {
        let resp = self
            .client
            .post(self.endpoint("/get_location_details"))
            .json(&LocationDetailsRequest {
                lat,
                lon,
                result_index,
            })
            .send()
            .await?;

        let status = resp.status();
        let body: LocationDetailsResponse = Self::decode_json(resp).await?;

        if !body.success {
            let message = body
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(BackendError::Rejected(message));
        }

        body.location_info
            .ok_or_else(|| BackendError::Rejected("missing location_info".to_string()))
    }
}
