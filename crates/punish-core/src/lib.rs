//! # punish-core
//! Foundation types, collaborator traits, live settings and the intensity
//! decision rules for Punisher.

pub mod constants;
pub mod error;
pub mod intensity;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ControllerError, DeviceError, InspectorError, PunishError};
pub use intensity::{direct_intensity, escalate, Escalation};
pub use settings::{PunishSettings, SettingsHandle};
pub use traits::{DeviceDriver, MemoryInspector};
pub use types::{
    HealthEvent, HealthSink, InspectionTarget, PlayerId, PointerPath, PunishRule,
    PunishmentReport, SeatPositions,
};
