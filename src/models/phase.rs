use crate::lights::pedestrian::PedestrianLightState;
use crate::lights::vehicle::VehicleLightState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Intersection-wide mode governing which approach may show green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Stopped,
    MainOnly,
    MainToSide,
    SideOnly,
    SideToPed,
    PedOnly,
    PedToSide,
    SideToMain,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Stopped,
        Phase::MainOnly,
        Phase::MainToSide,
        Phase::SideOnly,
        Phase::SideToPed,
        Phase::PedOnly,
        Phase::PedToSide,
        Phase::SideToMain,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Phase::Stopped => "System stopped (warning lights)",
            Phase::MainOnly => "Main road traffic flowing",
            Phase::MainToSide => "Switching from main to side road",
            Phase::SideOnly => "Side road traffic flowing",
            Phase::SideToPed => "Switching from side road to pedestrian",
            Phase::PedOnly => "Pedestrian crossing active",
            Phase::PedToSide => "Switching from pedestrian to side road",
            Phase::SideToMain => "Switching from side to main road",
        }
    }

    /// A crossing is running or already scheduled; new requests are ignored.
    pub fn crossing_in_progress(self) -> bool {
        matches!(self, Phase::SideToPed | Phase::PedOnly | Phase::PedToSide)
    }

    /// Whether the given light combination is one this phase may show.
    pub fn permits(
        self,
        main: VehicleLightState,
        side: VehicleLightState,
        pedestrian: PedestrianLightState,
    ) -> bool {
        use PedestrianLightState as P;
        use VehicleLightState as V;

        // Red or about to go, never moving traffic.
        let holding = |s: VehicleLightState| matches!(s, V::Red | V::RedYellow);

        match self {
            Phase::Stopped => !main.is_go() && !side.is_go() && !pedestrian.is_go(),
            Phase::MainOnly => main == V::Green && side == V::Red && pedestrian == P::Red,
            Phase::SideOnly => side == V::Green && main == V::Red && pedestrian == P::Red,
            Phase::MainToSide => main == V::Red && holding(side) && pedestrian == P::Red,
            Phase::SideToMain => side == V::Red && holding(main) && pedestrian == P::Red,
            Phase::SideToPed => main == V::Red && side == V::Red && pedestrian == P::Red,
            Phase::PedOnly => main == V::Red && side == V::Red && pedestrian == P::Green,
            Phase::PedToSide => holding(main) && holding(side) && pedestrian == P::Red,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
