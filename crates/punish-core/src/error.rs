//! Error types for Punisher.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectorError {
    #[error("inspector unavailable: {0}")] Unavailable(String),
    #[error("seat positions not known yet")] SeatsUnknown,
    #[error("read failed: {0}")] Read(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")] Invalid { field: &'static str, reason: String },
    #[error("failed to load settings: {0}")] Load(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device rejected command: {0}")] Rejected(String),
    #[error("device disconnected")] Disconnected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error(transparent)] Inspector(#[from] InspectorError),
    #[error("controller task is no longer running")] Closed,
}

#[derive(Error, Debug)]
pub enum PunishError {
    #[error(transparent)] Inspector(#[from] InspectorError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Device(#[from] DeviceError),
    #[error(transparent)] Controller(#[from] ControllerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_names_field() {
        let err = ConfigError::Invalid { field: "intensity_cap", reason: "must be at most 200".into() };
        assert_eq!(err.to_string(), "invalid intensity_cap: must be at most 200");
    }

    #[test]
    fn controller_error_wraps_inspector() {
        let err: ControllerError = InspectorError::Unavailable("process not found".into()).into();
        assert_eq!(err.to_string(), "inspector unavailable: process not found");
        let top: PunishError = err.into();
        assert!(matches!(top, PunishError::Controller(ControllerError::Inspector(_))));
    }
}
