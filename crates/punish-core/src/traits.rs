//! Collaborator interfaces.
//!
//! - [`MemoryInspector`]: watches the game and reports health changes
//!   (punish-inspector implements)
//! - [`DeviceDriver`]: applies intensity commands to the haptic device

use async_trait::async_trait;

use crate::error::{DeviceError, InspectorError};
use crate::types::{HealthSink, InspectionTarget, PlayerId, SeatPositions};

/// Source of health-change events and seat identity.
///
/// Events are delivered through the [`HealthSink`] passed to
/// [`start`](Self::start), from whatever thread the inspector runs on.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait MemoryInspector: Send + Sync {
    /// Begin watching `target`, publishing every health change to `sink`.
    fn start(&self, target: &InspectionTarget, sink: HealthSink) -> Result<(), InspectorError>;

    /// Stop watching. Safe to call when not started.
    fn stop(&self);

    /// The local player's seat numbers for networked and local matches.
    fn seat_positions(&self) -> Result<SeatPositions, InspectorError>;

    /// Last observed health for `player`, 0 when unknown.
    fn player_health(&self, player: PlayerId) -> i32;
}

/// A haptic device that accepts absolute intensity commands.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Set the output intensity. Resolves when the device has acknowledged.
    async fn set_intensity(&self, value: u32) -> Result<(), DeviceError>;
}
