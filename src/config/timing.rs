use crate::error::{ConfigError, ConfigValidationError};
use crate::global_variables::{
    MIN_BLINK_INTERVAL_MS, MIN_PEDESTRIAN_GREEN_MS, MIN_YELLOW_DURATION_MS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Unvalidated per-road timings in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadTimingSpec {
    pub green: Option<u64>,
    pub yellow: Option<u64>,
    pub red: Option<u64>,
    pub red_yellow: Option<u64>,
    pub transition: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedestrianTimingSpec {
    pub green: Option<u64>,
    pub transition: Option<u64>,
}

/// Raw timing input, as read from JSON or built in code.
///
/// `Default` yields the standard timing plan; fields missing from a JSON
/// document stay `None` and are reported by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSpec {
    #[serde(rename = "BLINK_INTERVAL", default)]
    pub blink_interval: Option<u64>,
    #[serde(rename = "DEFAULT", default)]
    pub default: RoadTimingSpec,
    #[serde(rename = "MAIN_ROAD", default)]
    pub main_road: RoadTimingSpec,
    #[serde(rename = "PEDESTRIAN", default)]
    pub pedestrian: PedestrianTimingSpec,
}

impl Default for TimingSpec {
    fn default() -> Self {
        let road = RoadTimingSpec {
            green: Some(5000),
            yellow: Some(1000),
            red: Some(2000),
            red_yellow: Some(2000),
            transition: Some(1000),
        };
        Self {
            blink_interval: Some(500),
            default: road,
            main_road: road,
            pedestrian: PedestrianTimingSpec {
                green: Some(5000),
                transition: Some(1000),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadTiming {
    pub green: Duration,
    pub yellow: Duration,
    pub red: Duration,
    pub red_yellow: Duration,
    pub transition: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedestrianTiming {
    pub green: Duration,
    pub transition: Duration,
}

/// Validated phase durations. Cannot be altered once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfiguration {
    default: RoadTiming,
    main_road: RoadTiming,
    pedestrian: PedestrianTiming,
    blink_interval: Duration,
}

struct RoadFields {
    green: &'static str,
    yellow: &'static str,
    red: &'static str,
    red_yellow: &'static str,
    transition: &'static str,
}

const DEFAULT_FIELDS: RoadFields = RoadFields {
    green: "DEFAULT.green",
    yellow: "DEFAULT.yellow",
    red: "DEFAULT.red",
    red_yellow: "DEFAULT.redYellow",
    transition: "DEFAULT.transition",
};

const MAIN_ROAD_FIELDS: RoadFields = RoadFields {
    green: "MAIN_ROAD.green",
    yellow: "MAIN_ROAD.yellow",
    red: "MAIN_ROAD.red",
    red_yellow: "MAIN_ROAD.redYellow",
    transition: "MAIN_ROAD.transition",
};

fn require(value: Option<u64>, field: &'static str) -> Result<u64, ConfigValidationError> {
    value.ok_or(ConfigValidationError::MissingField { field })
}

fn road_timing(
    spec: &RoadTimingSpec,
    fields: &RoadFields,
) -> Result<RoadTiming, ConfigValidationError> {
    Ok(RoadTiming {
        green: Duration::from_millis(require(spec.green, fields.green)?),
        yellow: Duration::from_millis(require(spec.yellow, fields.yellow)?),
        red: Duration::from_millis(require(spec.red, fields.red)?),
        red_yellow: Duration::from_millis(require(spec.red_yellow, fields.red_yellow)?),
        transition: Duration::from_millis(require(spec.transition, fields.transition)?),
    })
}

fn check_yellow(timing: &RoadTiming, field: &'static str) -> Result<(), ConfigValidationError> {
    let actual_ms = timing.yellow.as_millis() as u64;
    if actual_ms < MIN_YELLOW_DURATION_MS {
        return Err(ConfigValidationError::YellowTooShort {
            field,
            actual_ms,
            min_ms: MIN_YELLOW_DURATION_MS,
        });
    }
    Ok(())
}

impl TryFrom<TimingSpec> for TimingConfiguration {
    type Error = ConfigValidationError;

    fn try_from(spec: TimingSpec) -> Result<Self, Self::Error> {
        let default = road_timing(&spec.default, &DEFAULT_FIELDS)?;
        let main_road = road_timing(&spec.main_road, &MAIN_ROAD_FIELDS)?;
        let pedestrian = PedestrianTiming {
            green: Duration::from_millis(require(spec.pedestrian.green, "PEDESTRIAN.green")?),
            transition: Duration::from_millis(require(
                spec.pedestrian.transition,
                "PEDESTRIAN.transition",
            )?),
        };
        let blink_interval = Duration::from_millis(require(spec.blink_interval, "BLINK_INTERVAL")?);

        check_yellow(&default, DEFAULT_FIELDS.yellow)?;
        check_yellow(&main_road, MAIN_ROAD_FIELDS.yellow)?;

        let ped_green_ms = pedestrian.green.as_millis() as u64;
        if ped_green_ms < MIN_PEDESTRIAN_GREEN_MS {
            return Err(ConfigValidationError::PedestrianGreenTooShort {
                actual_ms: ped_green_ms,
                min_ms: MIN_PEDESTRIAN_GREEN_MS,
            });
        }

        let blink_ms = blink_interval.as_millis() as u64;
        if blink_ms < MIN_BLINK_INTERVAL_MS {
            return Err(ConfigValidationError::BlinkIntervalTooShort {
                actual_ms: blink_ms,
                min_ms: MIN_BLINK_INTERVAL_MS,
            });
        }

        Ok(Self {
            default,
            main_road,
            pedestrian,
            blink_interval,
        })
    }
}

impl Default for TimingConfiguration {
    fn default() -> Self {
        // Standard plan, satisfies every rule checked in `try_from`.
        let road = RoadTiming {
            green: Duration::from_millis(5000),
            yellow: Duration::from_millis(1000),
            red: Duration::from_millis(2000),
            red_yellow: Duration::from_millis(2000),
            transition: Duration::from_millis(1000),
        };
        Self {
            default: road,
            main_road: road,
            pedestrian: PedestrianTiming {
                green: Duration::from_millis(5000),
                transition: Duration::from_millis(1000),
            },
            blink_interval: Duration::from_millis(500),
        }
    }
}

impl TimingConfiguration {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let spec: TimingSpec = serde_json::from_str(json)?;
        Ok(Self::try_from(spec)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Timings of the default road class, used by the side road.
    pub fn default_road(&self) -> RoadTiming {
        self.default
    }

    pub fn main_road(&self) -> RoadTiming {
        self.main_road
    }

    pub fn pedestrian(&self) -> PedestrianTiming {
        self.pedestrian
    }

    pub fn blink_interval(&self) -> Duration {
        self.blink_interval
    }
}
