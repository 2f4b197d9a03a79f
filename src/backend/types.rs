// Wire types for the four analysis endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned identifier of one analysis job; addresses the
/// progress and result endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload for the job-start call. The engine does not interpret the image
/// or model fields; they pass through to the server untouched.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    /// Image as a base64 data URL.
    pub image: String,
    /// Model identifier understood by the server.
    pub model: String,
    pub max_results: u32,
    pub precision_mode: bool,
    pub iterations: u32,
    pub final_results: u32,
    pub test_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_lon: Option<f64>,
}

impl AnalysisRequest {
    /// Whether this request runs more than one server-side iteration,
    /// which is what makes progress polling worthwhile.
    pub fn is_iterative(&self) -> bool {
        self.precision_mode && self.iterations > 1
    }
}

/// Job-start response body.
#[derive(Debug, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Starting,
    Running,
    Completed,
    Error,
    /// Anything the progress store answers for an id it does not know.
    #[serde(other)]
    Unknown,
}

/// One poll of the progress endpoint. Ephemeral; superseded by the next poll.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub current: u32,
    #[serde(default = "default_total")]
    pub total: u32,
    pub status: ProgressStatus,
}

fn default_total() -> u32 {
    1
}

/// Outcome of one poll of the results endpoint: 202 keeps waiting,
/// 200 carries the terminal payload.
#[derive(Debug)]
pub enum ResultsPoll {
    Pending,
    Ready(ResultsPayload),
}

/// Terminal result set for one analysis.
///
/// Test-mode fields are opaque passthrough: the engine hands them to the
/// caller without interpreting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsPayload {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<ResultItem>,
    #[serde(default)]
    pub total_found: Option<u32>,
    #[serde(default)]
    pub precision_mode: Option<bool>,
    #[serde(default)]
    pub iterations: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub test_mode: Option<bool>,
    #[serde(default)]
    pub test_results: Option<serde_json::Value>,
    #[serde(default)]
    pub test_summary: Option<serde_json::Value>,
    #[serde(default)]
    pub true_coordinates: Option<serde_json::Value>,
}

/// One predicted location. Rank 0 is the most probable result; the rank is
/// the item's 0-based position in `results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    /// Stable identity, unique within one session's result set.
    pub id: u64,
    pub latitude: f64,
    pub longitude: f64,
    /// Cluster weight from the server's precision mode, when present.
    #[serde(default)]
    pub confidence: Option<u64>,
    #[serde(default)]
    pub total_points: Option<u64>,
    /// Placeholder at creation; the resolver fills the real address in later.
    #[serde(default)]
    pub location_info: Option<LocationInfo>,
}

/// Reverse-geocoded address details for one coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
}

/// Request body for the reverse-geocode endpoint.
#[derive(Debug, Serialize)]
pub struct LocationDetailsRequest {
    pub lat: f64,
    pub lon: f64,
    pub result_index: usize,
}

/// Response body for the reverse-geocode endpoint.
#[derive(Debug, Deserialize)]
pub struct LocationDetailsResponse {
    pub success: bool,
    #[serde(default)]
    pub location_info: Option<LocationInfo>,
    #[serde(default)]
    pub error: Option<String>,
}
