// Client-side engine for a server-executed image-geolocation analysis:
// session lifecycle, progress/result polling, and deduplicated address lookups.

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod backend;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing once for the whole process. Safe to call repeatedly.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("analysis client tracing initialized");
    });
}
