//! # punish-controller
//! Damage to haptic intensity.
//!
//! - [`controller::PunishmentController`]: the single-task state machine
//!   that turns health events into intensity commands
//! - [`decay::DecayTimer`]: the restartable return-to-baseline timer
//! - [`device::DeviceLink`]: ordered, non-blocking delivery to a
//!   [`punish_core::DeviceDriver`]

pub mod controller;
pub mod decay;
pub mod device;

pub use controller::{ControllerHandle, ControllerStatus, PunishmentController};
pub use decay::DecayTimer;
pub use device::{DeviceLink, TracingDevice};
