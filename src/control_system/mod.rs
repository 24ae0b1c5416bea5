pub mod interlock;
pub mod intersection_controller;
pub mod scheduler;
pub mod snapshot_hub;

pub use intersection_controller::IntersectionController;
pub use scheduler::{Scheduler, Wake};
pub use snapshot_hub::{SnapshotHub, StateObserver};
