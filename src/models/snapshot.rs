use crate::lights::pedestrian::PedestrianLightState;
use crate::lights::vehicle::VehicleLightState;
use crate::models::phase::Phase;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the whole intersection, pushed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionSnapshot {
    pub main_road: VehicleLightState,
    pub side_road: VehicleLightState,
    pub pedestrian: PedestrianLightState,
    pub pedestrian_request: bool,
    pub current_phase: Phase,
    pub is_running: bool,
    pub status_text: String,
}

impl IntersectionSnapshot {
    /// Idle presentation shown right after construction.
    pub fn idle() -> Self {
        Self {
            main_road: VehicleLightState::Yellow,
            side_road: VehicleLightState::Yellow,
            pedestrian: PedestrianLightState::Red,
            pedestrian_request: false,
            current_phase: Phase::Stopped,
            is_running: false,
            status_text: Phase::Stopped.description().to_string(),
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.current_phase = phase;
        self.status_text = phase.description().to_string();
    }

    pub fn has_conflicting_greens(&self) -> bool {
        self.main_road.is_go() && self.side_road.is_go()
    }

    pub fn vehicle_green_during_crossing(&self) -> bool {
        self.pedestrian.is_go() && (self.main_road.is_go() || self.side_road.is_go())
    }

    /// Every vehicle head and the pedestrian head show red or stop.
    pub fn all_stop(&self) -> bool {
        self.main_road == VehicleLightState::Red
            && self.side_road == VehicleLightState::Red
            && self.pedestrian == PedestrianLightState::Red
    }
}
