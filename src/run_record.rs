//! Run results and history
//!
//! The serializable record an external collaborator persists when a race
//! reaches the finished state, plus a bounded history container. The core
//! never touches storage itself; it only exposes these plain data types.

use serde::{Deserialize, Serialize};

use crate::sim::GameEvent;

/// Number of most-recent runs the history keeps
pub const MAX_RUNS: usize = 20;

/// Everything worth persisting about one finished race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Wall-clock timestamp (ms since epoch), supplied by the caller
    pub timestamp: f64,
    pub score: u32,
    pub gates_cleared: u32,
    pub gates_missed: u32,
    pub collisions: u32,
    pub max_combo: u32,
    /// Race duration in seconds of simulated time
    pub duration: f64,
    /// Distance covered in course units
    pub distance: f32,
    /// Whether the full course was covered
    pub completed: bool,
    pub seed: i64,
    pub interrupted: bool,
    /// Full session event log, for run verification
    pub event_log: Vec<GameEvent>,
}

/// Bounded run history, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunHistory {
    pub runs: Vec<RunRecord>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a run, dropping the oldest past [`MAX_RUNS`]
    pub fn add_run(&mut self, record: RunRecord) {
        self.runs.insert(0, record);
        self.runs.truncate(MAX_RUNS);
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Most recent run, if any
    pub fn latest(&self) -> Option<&RunRecord> {
        self.runs.first()
    }

    /// Highest score across kept runs
    pub fn best_score(&self) -> Option<u32> {
        self.runs.iter().map(|r| r.score).max()
    }
}

/// Format a duration as `M:SS.cc`, the way the results screen shows
/// completion times
pub fn format_race_time(seconds: f64) -> String {
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let centis = ((seconds % 1.0) * 100.0).floor() as u64;
    format!("{mins}:{secs:02}.{centis:02}")
}
