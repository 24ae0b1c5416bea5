//! Signal heads owned by the intersection controller.
//!
//! Vehicle and pedestrian heads are separate types sharing the minimal
//! [`LightController`] contract; request handling exists only on the
//! pedestrian head. Every mutation fires a [`LightEvent`] to the listener
//! supplied at construction.

pub mod pedestrian;
pub mod vehicle;

use crate::error::OperationNotSupportedError;
use pedestrian::{PedestrianLightState, PedestrianStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use vehicle::{Road, VehicleLightState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightId {
    MainRoad,
    SideRoad,
    Pedestrian,
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightId::MainRoad => write!(f, "main road"),
            LightId::SideRoad => write!(f, "side road"),
            LightId::Pedestrian => write!(f, "pedestrian"),
        }
    }
}

/// Emitted synchronously after every `set_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightEvent {
    Vehicle {
        road: Road,
        state: VehicleLightState,
    },
    Pedestrian(PedestrianStatus),
}

pub type LightListener = Arc<dyn Fn(LightEvent) + Send + Sync>;

pub trait LightController {
    type State: Copy;
    type Update;

    /// Current state by value.
    fn get_state(&self) -> Self::State;

    /// Merge `update` into the current state and notify the listener.
    fn set_state(&mut self, update: Self::Update);
}

/// Read-only view of a single head, handed to outside callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightView {
    Vehicle {
        road: Road,
        state: VehicleLightState,
    },
    Pedestrian(PedestrianStatus),
}

impl LightView {
    pub fn id(&self) -> LightId {
        match self {
            LightView::Vehicle { road, .. } => (*road).into(),
            LightView::Pedestrian(_) => LightId::Pedestrian,
        }
    }

    pub fn is_go(&self) -> bool {
        match self {
            LightView::Vehicle { state, .. } => state.is_go(),
            LightView::Pedestrian(status) => status.state.is_go(),
        }
    }

    pub fn pedestrian_state(&self) -> Result<PedestrianLightState, OperationNotSupportedError> {
        match self {
            LightView::Pedestrian(status) => Ok(status.state),
            LightView::Vehicle { road, .. } => Err(OperationNotSupportedError {
                operation: "pedestrianState",
                light: (*road).into(),
            }),
        }
    }

    pub fn has_request(&self) -> Result<bool, OperationNotSupportedError> {
        match self {
            LightView::Pedestrian(status) => Ok(status.has_request),
            LightView::Vehicle { road, .. } => Err(OperationNotSupportedError {
                operation: "hasRequest",
                light: (*road).into(),
            }),
        }
    }
}
