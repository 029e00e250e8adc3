//! Core data types: players, health events, seats, inspection targets and
//! punishment reports.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CHIP_DAMAGE_THRESHOLD;

/// One of the two fighters, numbered the way the game numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    /// Both players in seat order.
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    /// The game's numeric player id (1 or 2).
    pub fn number(self) -> i32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<i32> for PlayerId {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(other),
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}P", self.number())
    }
}

/// A single observed change in a player's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub player: PlayerId,
    pub new_health: i32,
    pub old_health: i32,
}

impl HealthEvent {
    pub fn new(player: PlayerId, new_health: i32, old_health: i32) -> Self {
        Self {
            player,
            new_health,
            old_health,
        }
    }

    /// Health lost by this change. Negative when the player healed.
    pub fn damage(&self) -> i64 {
        i64::from(self.old_health) - i64::from(self.new_health)
    }

    /// Whether the damage is large enough to punish. Chip damage from
    /// blocking and healing both fall below the threshold.
    pub fn exceeds_chip_threshold(&self) -> bool {
        self.damage() > CHIP_DAMAGE_THRESHOLD
    }
}

/// The local player's seat numbers as reported by the game.
///
/// The game tracks the seat separately for networked and local matches.
/// An odd seat number means the local player controls player 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeatPositions {
    pub networked: i32,
    pub local: i32,
}

impl SeatPositions {
    /// The seat number that applies to the current match type.
    pub fn own_seat(&self, is_local_match: bool) -> i32 {
        if is_local_match { self.local } else { self.networked }
    }

    /// Whether the local player sits in seat 1.
    pub fn is_seat_one(&self, is_local_match: bool) -> bool {
        self.own_seat(is_local_match) % 2 == 1
    }

    /// Whether `player` is the fighter controlled by the local player.
    pub fn owns(&self, player: PlayerId, is_local_match: bool) -> bool {
        let seat_one = self.is_seat_one(is_local_match);
        match player {
            PlayerId::One => seat_one,
            PlayerId::Two => !seat_one,
        }
    }
}

/// Which escalation rule produced a commanded intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunishRule {
    /// The hit alone was harder than the running punishment.
    Direct,
    /// A weaker hit landed inside the punishment window and bumped it.
    Combo,
}

impl fmt::Display for PunishRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Combo => f.write_str("combo"),
        }
    }
}

/// Emitted once per qualifying health event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunishmentReport {
    pub player: PlayerId,
    pub damage: i64,
    pub intensity: u32,
    pub rule: PunishRule,
    pub at: DateTime<Utc>,
}

/// A pointer chain: a module-relative base offset followed by the offsets
/// applied after each dereference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointerPath {
    pub base_offset: u64,
    pub offsets: Vec<u64>,
}

impl PointerPath {
    pub fn new(base_offset: u64, offsets: impl Into<Vec<u64>>) -> Self {
        Self {
            base_offset,
            offsets: offsets.into(),
        }
    }
}

/// Everything an inspector needs to locate the values it watches.
///
/// The controller passes this through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionTarget {
    pub process_name: String,
    pub module_name: String,
    pub player_one: PointerPath,
    pub player_two: PointerPath,
    pub networked_seat_offset: u64,
    pub local_seat_offset: u64,
}

impl InspectionTarget {
    /// Addresses for Guilty Gear -Strive- on Win64.
    pub fn guilty_gear_strive() -> Self {
        Self {
            process_name: "GGST-Win64-Shipping.exe".to_string(),
            module_name: "GGST-Win64-Shipping.exe".to_string(),
            player_one: PointerPath::new(0x051B_4158, [0x1C0, 0x28, 0x1220]),
            player_two: PointerPath::new(0x051B_4158, [0x1C0, 0x1A0, 0x1220]),
            networked_seat_offset: 0x04D3_83F4,
            local_seat_offset: 0x0454_1FCC,
        }
    }

    /// Pointer path for the given player's health value.
    pub fn health_path(&self, player: PlayerId) -> &PointerPath {
        match player {
            PlayerId::One => &self.player_one,
            PlayerId::Two => &self.player_two,
        }
    }
}

impl Default for InspectionTarget {
    fn default() -> Self {
        Self::guilty_gear_strive()
    }
}

/// Callback handed to an inspector on start; the inspector publishes every
/// observed health change through it.
///
/// `publish` may be called from any thread and must never block.
#[derive(Clone)]
pub struct HealthSink {
    publish: Arc<dyn Fn(HealthEvent) + Send + Sync>,
}

impl HealthSink {
    pub fn new(publish: impl Fn(HealthEvent) + Send + Sync + 'static) -> Self {
        Self {
            publish: Arc::new(publish),
        }
    }

    pub fn publish(&self, event: HealthEvent) {
        (self.publish)(event)
    }
}

impl fmt::Debug for HealthSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthSink").finish_non_exhaustive()
    }
}
