//! Scoring and combo state
//!
//! A pure reducer over resolution events. Score never goes negative;
//! the combo multiplier is always at least 1 and resets on any miss or
//! collision.

use serde::{Deserialize, Serialize};

/// Points per gate pass, multiplied by the current combo
const GATE_PASS_POINTS: u32 = 10;
/// Penalty for missing a gate
const GATE_MISS_PENALTY: u32 = 20;
/// Penalty for hitting an obstacle
const COLLISION_PENALTY: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self {
            score: 0,
            combo: 1,
            max_combo: 1,
        }
    }
}

impl Scoreboard {
    /// Score a gate pass and advance the combo. The multiplier applied is
    /// the combo value *before* this pass's increment, so the first gate
    /// of a streak scores at x1. Returns the points awarded.
    pub fn apply_gate_pass(&mut self) -> u32 {
        let points = GATE_PASS_POINTS * self.combo;
        self.score += points;
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        points
    }

    /// Penalize a gate miss and reset the combo. Returns true if the combo
    /// value actually changed.
    pub fn apply_gate_miss(&mut self) -> bool {
        self.score = self.score.saturating_sub(GATE_MISS_PENALTY);
        self.reset_combo()
    }

    /// Penalize an obstacle collision and reset the combo. Returns true if
    /// the combo value actually changed.
    pub fn apply_collision(&mut self) -> bool {
        self.score = self.score.saturating_sub(COLLISION_PENALTY);
        self.reset_combo()
    }

    fn reset_combo(&mut self) -> bool {
        let changed = self.combo != 1;
        self.combo = 1;
        changed
    }
}
