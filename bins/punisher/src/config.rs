//! Settings loading for the runner.
//!
//! Layers, lowest precedence first: built-in defaults, a TOML file, then
//! `PUNISHER_*` environment variables (e.g. `PUNISHER_INTENSITY_CAP=120`).
//! Command-line overrides are applied afterwards through the settings
//! handle so they go through the same validation as live edits.

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};

use punish_core::error::ConfigError;
use punish_core::settings::PunishSettings;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PUNISHER";

/// `<config dir>/punisher/punisher.toml`, falling back to the working directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("punisher")
        .join("punisher.toml")
}

/// Load and validate settings.
///
/// An explicit `path` must exist; the default path is optional.
pub fn load_settings(path: Option<&Path>) -> Result<PunishSettings, ConfigError> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::from(default_config_path()).required(false),
    };

    let settings: PunishSettings = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .and_then(Config::try_deserialize::<PunishSettings>)
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    settings.validate()?;
    Ok(settings)
}
