pub mod phase;
pub mod snapshot;

pub use phase::Phase;
pub use snapshot::IntersectionSnapshot;
