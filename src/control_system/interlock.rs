use crate::error::ControllerError;
use crate::lights::pedestrian::PedestrianLightState;
use crate::lights::vehicle::{Road, VehicleLightState};
use crate::lights::LightId;
use crate::models::phase::Phase;

/// Current display of the three heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heads {
    pub main: VehicleLightState,
    pub side: VehicleLightState,
    pub pedestrian: PedestrianLightState,
}

/// Refuse a vehicle write that would grant green against a conflicting head.
pub fn check_vehicle_write(
    heads: &Heads,
    road: Road,
    requested: VehicleLightState,
) -> Result<(), ControllerError> {
    if !requested.is_go() {
        return Ok(());
    }
    let opposing = match road {
        Road::Main => heads.side,
        Road::Side => heads.main,
    };
    if opposing.is_go() {
        return Err(ControllerError::ConflictingGreens {
            light: road.into(),
            requested: requested.name(),
            reason: "opposing road is green",
        });
    }
    if heads.pedestrian.is_go() {
        return Err(ControllerError::ConflictingGreens {
            light: road.into(),
            requested: requested.name(),
            reason: "pedestrian crossing is green",
        });
    }
    Ok(())
}

pub fn check_pedestrian_write(
    heads: &Heads,
    requested: PedestrianLightState,
) -> Result<(), ControllerError> {
    if requested.is_go() && (heads.main.is_go() || heads.side.is_go()) {
        return Err(ControllerError::ConflictingGreens {
            light: LightId::Pedestrian,
            requested: requested.name(),
            reason: "vehicle road is green",
        });
    }
    Ok(())
}

/// Lights must show the combination `phase` permits before it takes effect.
pub fn check_phase(heads: &Heads, phase: Phase) -> Result<(), ControllerError> {
    if phase.permits(heads.main, heads.side, heads.pedestrian) {
        Ok(())
    } else {
        Err(ControllerError::PhaseMismatch {
            phase,
            main: heads.main.name(),
            side: heads.side.name(),
            pedestrian: heads.pedestrian.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PedestrianLightState as P;
    use VehicleLightState as V;

    fn heads(main: V, side: V, pedestrian: P) -> Heads {
        Heads {
            main,
            side,
            pedestrian,
        }
    }

    #[test]
    fn green_refused_while_opposing_road_green() {
        let h = heads(V::Green, V::Red, P::Red);
        let err = check_vehicle_write(&h, Road::Side, V::Green).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::ConflictingGreens {
                light: LightId::SideRoad,
                ..
            }
        ));
        assert!(check_vehicle_write(&h, Road::Side, V::RedYellow).is_ok());
    }

    #[test]
    fn vehicle_green_refused_during_crossing() {
        let h = heads(V::Red, V::Red, P::Green);
        assert!(check_vehicle_write(&h, Road::Main, V::Green).is_err());
        assert!(check_vehicle_write(&h, Road::Main, V::Red).is_ok());
    }

    #[test]
    fn crossing_refused_while_traffic_flows() {
        assert!(check_pedestrian_write(&heads(V::Red, V::Green, P::Red), P::Green).is_err());
        assert!(check_pedestrian_write(&heads(V::Yellow, V::Red, P::Red), P::Green).is_ok());
        assert!(check_pedestrian_write(&heads(V::Green, V::Red, P::Red), P::Red).is_ok());
    }

    #[test]
    fn phase_check_reports_current_lights() {
        let err = check_phase(&heads(V::Green, V::Red, P::Red), Phase::MainToSide).unwrap_err();
        assert_eq!(
            err,
            ControllerError::PhaseMismatch {
                phase: Phase::MainToSide,
                main: "green",
                side: "red",
                pedestrian: "red"
            }
        );
        assert!(check_phase(&heads(V::Red, V::Red, P::Green), Phase::PedOnly).is_ok());
    }
}
