//! Recorded-match playback.
//!
//! A replay file is JSON lines, one [`ReplayFrame`] per line:
//!
//! ```text
//! # t(ms) and both health bars; seats default to 1
//! {"at_ms": 0,    "p1": 420, "p2": 420}
//! {"at_ms": 1500, "p1": 380, "p2": 420}
//! ```
//!
//! Once attached, reads return the last frame whose `at_ms` has passed.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use punish_core::error::InspectorError;
use punish_core::types::{InspectionTarget, PlayerId, SeatPositions};

use crate::poller::HealthSource;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to read replay file: {0}")] Io(#[from] std::io::Error),
    #[error("line {line}: {source}")] Parse { line: usize, source: serde_json::Error },
    #[error("replay contains no frames")] Empty,
}

fn seat_one() -> i32 {
    1
}

/// Game state at one instant of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Offset from replay start, in milliseconds.
    pub at_ms: u64,
    pub p1: i32,
    pub p2: i32,
    #[serde(default = "seat_one")]
    pub networked_seat: i32,
    #[serde(default = "seat_one")]
    pub local_seat: i32,
}

impl ReplayFrame {
    fn health(&self, player: PlayerId) -> i32 {
        match player {
            PlayerId::One => self.p1,
            PlayerId::Two => self.p2,
        }
    }
}

/// [`HealthSource`] backed by a list of timestamped frames.
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<ReplayFrame>,
    started: Mutex<Option<Instant>>,
}

impl ReplaySource {
    /// Build from frames in any order.
    pub fn from_frames(mut frames: Vec<ReplayFrame>) -> Result<Self, ReplayError> {
        if frames.is_empty() {
            return Err(ReplayError::Empty);
        }
        frames.sort_by_key(|f| f.at_ms);
        Ok(Self {
            frames,
            started: Mutex::new(None),
        })
    }

    /// Parse JSON-lines text. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, ReplayError> {
        let mut frames = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(line)
                .map_err(|source| ReplayError::Parse { line: idx + 1, source })?;
            frames.push(frame);
        }
        Self::from_frames(frames)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    /// Offset of the last frame.
    pub fn duration(&self) -> Duration {
        let last = self.frames.last().map_or(0, |f| f.at_ms);
        Duration::from_millis(last)
    }

    /// Whether playback has passed the last frame.
    pub fn finished(&self) -> bool {
        match *self.started.lock() {
            Some(started) => started.elapsed() >= self.duration(),
            None => false,
        }
    }

    fn current(&self) -> Result<&ReplayFrame, InspectorError> {
        let started = self
            .started
            .lock()
            .ok_or_else(|| InspectorError::Read("replay not attached".into()))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let passed = self.frames.partition_point(|f| f.at_ms <= elapsed_ms);
        passed
            .checked_sub(1)
            .map(|idx| &self.frames[idx])
            .ok_or_else(|| InspectorError::Read("replay has not reached its first frame".into()))
    }
}

impl HealthSource for ReplaySource {
    fn attach(&self, _target: &InspectionTarget) -> Result<(), InspectorError> {
        *self.started.lock() = Some(Instant::now());
        Ok(())
    }

    fn detach(&self) {
        *self.started.lock() = None;
    }

    fn read_health(&self, player: PlayerId) -> Result<i32, InspectorError> {
        self.current().map(|f| f.health(player))
    }

    fn read_seats(&self) -> Result<SeatPositions, InspectorError> {
        self.current().map(|f| SeatPositions {
            networked: f.networked_seat,
            local: f.local_seat,
        })
    }
}
