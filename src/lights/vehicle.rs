use super::{LightController, LightEvent, LightId, LightListener};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleLightState {
    Off,
    Red,
    RedYellow, // prepare to go
    Yellow,    // attention
    Green,
}

impl VehicleLightState {
    pub fn is_go(self) -> bool {
        self == VehicleLightState::Green
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleLightState::Off => "off",
            VehicleLightState::Red => "red",
            VehicleLightState::RedYellow => "red-yellow",
            VehicleLightState::Yellow => "yellow",
            VehicleLightState::Green => "green",
        }
    }
}

impl fmt::Display for VehicleLightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The approach a vehicle head controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Road {
    Main,
    Side,
}

impl From<Road> for LightId {
    fn from(road: Road) -> Self {
        match road {
            Road::Main => LightId::MainRoad,
            Road::Side => LightId::SideRoad,
        }
    }
}

pub struct VehicleLightController {
    road: Road,
    state: VehicleLightState,
    listener: LightListener,
}

impl VehicleLightController {
    pub fn new(road: Road, initial: VehicleLightState, listener: LightListener) -> Self {
        Self {
            road,
            state: initial,
            listener,
        }
    }
}

impl LightController for VehicleLightController {
    type State = VehicleLightState;
    type Update = VehicleLightState;

    fn get_state(&self) -> VehicleLightState {
        self.state
    }

    fn set_state(&mut self, update: VehicleLightState) {
        self.state = update;
        (self.listener)(LightEvent::Vehicle {
            road: self.road,
            state: self.state,
        });
    }
}
