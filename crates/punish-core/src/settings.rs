//! Live punishment settings.
//!
//! [`PunishSettings`] is a plain value with range validation.
//! [`SettingsHandle`] shares one instance between whoever edits the settings
//! and the controller, which takes a [`snapshot`](SettingsHandle::snapshot)
//! at the start of every decision so a single event never sees a mix of old
//! and new values.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{
    DEFAULT_BASELINE_INTENSITY, DEFAULT_COMBO_INCREMENT, DEFAULT_DECAY_DURATION_SECS,
    DEFAULT_INTENSITY_CAP, DEFAULT_INTENSITY_MULTIPLIER, MAX_DEVICE_INTENSITY,
    MAX_INTENSITY_MULTIPLIER,
};
use crate::error::ConfigError;

/// Tunables read by the controller at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunishSettings {
    /// Damage is multiplied by this to get the direct intensity.
    pub intensity_multiplier: f64,
    /// No command ever exceeds this intensity.
    pub intensity_cap: u32,
    /// Intensity commanded while idle.
    pub baseline_intensity: u32,
    /// Added to the running intensity when a weaker hit lands mid-punishment.
    pub combo_increment: u32,
    /// Quiet period after the last qualifying hit before returning to baseline.
    pub decay_duration_secs: f64,
    /// Punish damage taken by either fighter, not just the local player's.
    pub punish_all_players: bool,
    /// Read the local-match seat instead of the networked one.
    pub is_local_match: bool,
}

impl Default for PunishSettings {
    fn default() -> Self {
        Self {
            intensity_multiplier: DEFAULT_INTENSITY_MULTIPLIER,
            intensity_cap: DEFAULT_INTENSITY_CAP,
            baseline_intensity: DEFAULT_BASELINE_INTENSITY,
            combo_increment: DEFAULT_COMBO_INCREMENT,
            decay_duration_secs: DEFAULT_DECAY_DURATION_SECS,
            punish_all_players: false,
            is_local_match: false,
        }
    }
}

fn check_multiplier(value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && (0.0..=MAX_INTENSITY_MULTIPLIER).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            field: "intensity_multiplier",
            reason: format!("{value} is outside 0..={MAX_INTENSITY_MULTIPLIER}"),
        })
    }
}

fn check_intensity(field: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value <= MAX_DEVICE_INTENSITY {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside 0..={MAX_DEVICE_INTENSITY}"),
        })
    }
}

fn check_decay_secs(value: f64) -> Result<f64, ConfigError> {
    // Duration::from_secs_f64 panics on overflow, so bound it here too.
    if value.is_finite() && value > 0.0 && Duration::try_from_secs_f64(value).is_ok() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            field: "decay_duration_secs",
            reason: format!("{value} must be a positive number of seconds"),
        })
    }
}

impl PunishSettings {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_multiplier(self.intensity_multiplier)?;
        check_intensity("intensity_cap", self.intensity_cap)?;
        check_intensity("baseline_intensity", self.baseline_intensity)?;
        check_decay_secs(self.decay_duration_secs)?;
        Ok(())
    }

    /// The decay quiet period as a [`Duration`].
    ///
    /// Only meaningful on validated settings.
    pub fn decay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.decay_duration_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_DECAY_DURATION_SECS))
    }
}

/// Shared, validated settings.
///
/// Every setter validates its input first; a rejected value leaves the
/// previous one in place.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<PunishSettings>>,
}

impl SettingsHandle {
    /// Wrap validated settings.
    pub fn new(settings: PunishSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
        })
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> PunishSettings {
        self.inner.read().clone()
    }

    /// Replace all settings at once.
    pub fn replace(&self, settings: PunishSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        *self.inner.write() = settings;
        info!("settings replaced");
        Ok(())
    }

    pub fn set_intensity_multiplier(&self, value: f64) -> Result<(), ConfigError> {
        self.inner.write().intensity_multiplier = check_multiplier(value)?;
        info!(intensity_multiplier = value, "settings updated");
        Ok(())
    }

    pub fn set_intensity_cap(&self, value: u32) -> Result<(), ConfigError> {
        self.inner.write().intensity_cap = check_intensity("intensity_cap", value)?;
        info!(intensity_cap = value, "settings updated");
        Ok(())
    }

    pub fn set_baseline_intensity(&self, value: u32) -> Result<(), ConfigError> {
        self.inner.write().baseline_intensity = check_intensity("baseline_intensity", value)?;
        info!(baseline_intensity = value, "settings updated");
        Ok(())
    }

    pub fn set_combo_increment(&self, value: u32) {
        self.inner.write().combo_increment = value;
        info!(combo_increment = value, "settings updated");
    }

    /// Change the decay quiet period.
    ///
    /// A decay already counting down keeps its deadline; the new value
    /// applies from the next qualifying hit.
    pub fn set_decay_duration_secs(&self, value: f64) -> Result<(), ConfigError> {
        self.inner.write().decay_duration_secs = check_decay_secs(value)?;
        info!(decay_duration_secs = value, "settings updated");
        Ok(())
    }

    pub fn set_punish_all_players(&self, enabled: bool) {
        self.inner.write().punish_all_players = enabled;
        if enabled {
            info!("punish-all-players mode enabled");
        } else {
            info!("punish-all-players mode disabled");
        }
    }

    pub fn set_local_match(&self, enabled: bool) {
        self.inner.write().is_local_match = enabled;
        if enabled {
            info!("local match mode enabled");
        } else {
            info!("local match mode disabled");
        }
    }
}
