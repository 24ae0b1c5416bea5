pub mod timing;

pub use timing::{
    PedestrianTiming, PedestrianTimingSpec, RoadTiming, RoadTimingSpec, TimingConfiguration,
    TimingSpec,
};
