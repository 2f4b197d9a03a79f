// Display seam — the engine pushes progress text and resolved addresses
// through this trait; rendering itself lives outside the crate.

use crate::backend::types::LocationInfo;

/// Sink for everything the engine wants shown.
///
/// One resolved address is delivered to two independent targets: the
/// result-list slot and the matching map marker popup.
pub trait DisplaySink: Send + Sync {
    /// Iteration progress for the running analysis ("iteration X/Y").
    fn progress_update(&self, current: u32, total: u32);

    /// All iterations done server-side; results are being finalized.
    fn progress_finalizing(&self);

    /// Address resolved for the list slot of the given result item.
    fn location_resolved(&self, identity: u64, info: &LocationInfo);

    /// Address resolved for the map marker popup of the given result item.
    fn marker_resolved(&self, identity: u64, info: &LocationInfo);
}

/// Display that drops everything. Useful for headless runs and tests
/// that only assert on network traffic.
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn progress_update(&self, _current: u32, _total: u32) {}
    fn progress_finalizing(&self) {}
    fn location_resolved(&self, _identity: u64, _info: &LocationInfo) {}
    fn marker_resolved(&self, _identity: u64, _info: &LocationInfo) {}
}
