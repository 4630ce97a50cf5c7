//! Throttling seam consulted before each source fetch.
//!
//! The pipeline asks the gate whether a source may be fetched and reports each successful
//! fetch back to it. How a gate decides (intervals, persisted timestamps) is up to the
//! implementation; `FetchOptions::force` bypasses the gate entirely.

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait FetchGate: Send + Sync {
    fn should_fetch(&self, source_id: &str) -> bool;

    fn record_fetch(&self, source_id: &str);
}

/// Lets every fetch through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysFetch;

impl FetchGate for AlwaysFetch {
    fn should_fetch(&self, _source_id: &str) -> bool {
        true
    }

    fn record_fetch(&self, _source_id: &str) {}
}
