use std::time::Duration;

// Safety floors
pub const MIN_PHASE_DURATION: Duration = Duration::from_millis(1000);
pub const MIN_YELLOW_DURATION_MS: u64 = 1000;
pub const MIN_PEDESTRIAN_GREEN_MS: u64 = 3000;
pub const MIN_BLINK_INTERVAL_MS: u64 = 100;

// Observer heartbeat
pub const STATE_UPDATE_INTERVAL: Duration = Duration::from_millis(100);
