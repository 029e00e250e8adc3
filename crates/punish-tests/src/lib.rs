//! Scenario and property test suite for Punisher.
//!
//! The integration tests under `tests/` drive a real controller task with
//! tokio's paused clock, a scripted inspector and a recording device.

pub mod helpers;
