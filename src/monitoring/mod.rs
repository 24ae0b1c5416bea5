pub mod snapshot_monitor;

pub use snapshot_monitor::{PhaseChange, SnapshotMonitor, Violation};
