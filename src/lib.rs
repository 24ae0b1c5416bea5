pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod lights;
pub mod models;
pub mod monitoring;

pub use config::{TimingConfiguration, TimingSpec};
pub use control_system::{IntersectionController, StateObserver};
pub use error::{ConfigError, ConfigValidationError, ControllerError, OperationNotSupportedError};
pub use models::{IntersectionSnapshot, Phase};
