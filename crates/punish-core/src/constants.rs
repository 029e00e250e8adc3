//! Fixed limits and defaults. Intensities are in device units (0..=200).

/// Damage at or below this value is treated as chip damage or healing and
/// never punished.
pub const CHIP_DAMAGE_THRESHOLD: i64 = 10;

/// Upper bound of the intensity multiplier setting.
pub const MAX_INTENSITY_MULTIPLIER: f64 = 100.0;

/// Highest intensity any device command may carry.
pub const MAX_DEVICE_INTENSITY: u32 = 200;

pub const DEFAULT_INTENSITY_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_INTENSITY_CAP: u32 = 200;
pub const DEFAULT_BASELINE_INTENSITY: u32 = 20;
pub const DEFAULT_COMBO_INCREMENT: u32 = 1;
pub const DEFAULT_DECAY_DURATION_SECS: f64 = 2.0;

/// Capacity of the channel carrying inspector events and control commands
/// into the controller task.
pub const CONTROLLER_QUEUE_CAPACITY: usize = 256;

/// Capacity of the punishment report broadcast channel.
pub const REPORT_CHANNEL_CAPACITY: usize = 64;

/// How often the polling inspector samples each player's health.
pub const HEALTH_POLL_INTERVAL_MS: u64 = 100;

/// How often the polling inspector samples seat positions.
pub const SEAT_POLL_INTERVAL_MS: u64 = 500;

/// Back-off after a failed read before the poller retries.
pub const READ_RETRY_BACKOFF_MS: u64 = 1_000;
