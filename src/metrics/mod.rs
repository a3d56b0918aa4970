pub mod exporter;
pub mod tracker;

pub use tracker::{AddOutcome, AppTracker, MetricsSnapshot, TrackedPod};
