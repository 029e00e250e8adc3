//! # punish-inspector
//! Health sampling.
//!
//! [`PollingInspector`] implements [`punish_core::MemoryInspector`] on top of
//! any [`HealthSource`]: it samples both players' health on a fixed interval,
//! publishes a [`punish_core::HealthEvent`] whenever a sample changes, and
//! keeps the latest seat positions cached for the controller.
//!
//! [`ReplaySource`] is a [`HealthSource`] that plays back a recorded match
//! from a JSON-lines file.

pub mod poller;
pub mod replay;

pub use poller::{HealthSource, PollConfig, PollingInspector};
pub use replay::{ReplayError, ReplayFrame, ReplaySource};
