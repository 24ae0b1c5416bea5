use super::{LightController, LightEvent, LightListener};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PedestrianLightState {
    Off,
    Red,
    Green,
}

impl PedestrianLightState {
    pub fn is_go(self) -> bool {
        self == PedestrianLightState::Green
    }

    pub fn name(self) -> &'static str {
        match self {
            PedestrianLightState::Off => "off",
            PedestrianLightState::Red => "red",
            PedestrianLightState::Green => "green",
        }
    }
}

impl fmt::Display for PedestrianLightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedestrianStatus {
    pub state: PedestrianLightState,
    pub has_request: bool,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PedestrianUpdate {
    pub state: Option<PedestrianLightState>,
    pub has_request: Option<bool>,
}

impl PedestrianUpdate {
    pub fn state(state: PedestrianLightState) -> Self {
        Self {
            state: Some(state),
            has_request: None,
        }
    }

    /// Set the head and clear the request latch in one notification.
    pub fn state_clearing_request(state: PedestrianLightState) -> Self {
        Self {
            state: Some(state),
            has_request: Some(false),
        }
    }
}

pub struct PedestrianLightController {
    status: PedestrianStatus,
    listener: LightListener,
}

impl PedestrianLightController {
    pub fn new(initial: PedestrianLightState, listener: LightListener) -> Self {
        Self {
            status: PedestrianStatus {
                state: initial,
                has_request: false,
            },
            listener,
        }
    }

    pub fn has_request(&self) -> bool {
        self.status.has_request
    }

    pub fn set_request(&mut self, has_request: bool) {
        self.set_state(PedestrianUpdate {
            state: None,
            has_request: Some(has_request),
        });
    }
}

impl LightController for PedestrianLightController {
    type State = PedestrianStatus;
    type Update = PedestrianUpdate;

    fn get_state(&self) -> PedestrianStatus {
        self.status
    }

    fn set_state(&mut self, update: PedestrianUpdate) {
        if let Some(state) = update.state {
            self.status.state = state;
        }
        if let Some(has_request) = update.has_request {
            self.status.has_request = has_request;
        }
        (self.listener)(LightEvent::Pedestrian(self.status));
    }
}
