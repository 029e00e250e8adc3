//! Single-slot decay timer.
//!
//! The timer holds at most one deadline. Arming replaces whatever was
//! pending, and firing disarms it, so each arm produces at most one decay.
//! The owning task waits on [`wait_for`] with the current deadline inside
//! its `select!` loop.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug, Default)]
pub struct DecayTimer {
    deadline: Option<Instant>,
}

impl DecayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a decay `after` from now, replacing any pending one.
    pub fn arm(&mut self, after: Duration) -> Instant {
        let deadline = Instant::now() + after;
        self.deadline = Some(deadline);
        deadline
    }

    /// Drop the pending decay. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Consume the pending decay. Returns `false` when nothing was armed,
    /// so a stale wake-up never decays twice.
    pub fn fire(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Resolve at `deadline`, or never when there is none.
pub async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
