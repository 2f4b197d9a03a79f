use serde::Deserialize;

/// Delay between progress polls in milliseconds.
pub const PROGRESS_POLL_INTERVAL_MS: u64 = 1000;

/// Delay between result polls while the server answers 202 (milliseconds).
pub const RESULT_POLL_INTERVAL_MS: u64 = 1000;

/// Decimal digits kept when rounding coordinates into a cache key.
/// Six digits is roughly 0.11 m of resolution at the equator.
pub const COORD_KEY_DECIMALS: u32 = 6;

/// Length of the random suffix in a generated session id.
pub const SESSION_ID_SUFFIX_LEN: usize = 9;

/// Top-level configuration for the analysis client engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the analysis server, without a trailing slash.
    pub base_url: String,
    /// Delay between progress polls in milliseconds.
    pub progress_poll_interval_ms: u64,
    /// Delay between result polls in milliseconds.
    pub result_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            progress_poll_interval_ms: PROGRESS_POLL_INTERVAL_MS,
            result_poll_interval_ms: RESULT_POLL_INTERVAL_MS,
        }
    }
}
