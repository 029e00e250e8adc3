//! Damage to intensity rules.
//!
//! Pure functions with no state: the controller feeds them the running
//! intensity and a settings snapshot and commands whatever they return.

use crate::types::PunishRule;

/// Outcome of blending a new hit into the running punishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    pub intensity: u32,
    pub rule: PunishRule,
}

/// Intensity for a single hit: `min(round(damage * multiplier), cap)`.
///
/// Rounds half away from zero. Non-positive or non-finite products map to 0.
pub fn direct_intensity(damage: i64, multiplier: f64, cap: u32) -> u32 {
    let scaled = (damage as f64 * multiplier).round();
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    if scaled >= f64::from(cap) {
        cap
    } else {
        scaled as u32
    }
}

/// Blend `candidate` into the running intensity.
///
/// A strictly harder hit replaces the running intensity. Anything else
/// counts as a combo and bumps the running intensity by `combo_increment`,
/// clamped to `cap`.
pub fn escalate(current: u32, candidate: u32, combo_increment: u32, cap: u32) -> Escalation {
    if candidate > current {
        Escalation {
            intensity: candidate,
            rule: PunishRule::Direct,
        }
    } else {
        Escalation {
            intensity: current.saturating_add(combo_increment).min(cap),
            rule: PunishRule::Combo,
        }
    }
}
