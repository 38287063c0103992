//! Race session and state machine
//!
//! Owns the ready -> countdown -> running -> finished lifecycle and
//! orchestrates the per-tick pipeline: physics, then proximity resolution,
//! then scoring, then the finish check. That order is load-bearing:
//! resolution needs the new position and the finish check needs the
//! updated distance.
//!
//! Consumers poll state through plain accessors. Low-frequency session
//! fields (score, combo, state) change rarely; the high-frequency vehicle
//! pose is read through [`RaceSession::vehicle`] once per rendered frame.

use std::collections::BTreeSet;

use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_TICK_DT, TRACK_LENGTH};
use crate::run_record::RunRecord;

use super::proximity::{ProximityEvent, ProximityResolver};
use super::scoring::Scoreboard;
use super::track::{self, Track, TrackError};
use super::vehicle::{ControlInputs, VehicleState};

/// Race lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceState {
    /// Waiting for a start request
    Ready,
    /// Countdown overlay is showing; session fields are reset
    Countdown,
    /// Simulation advances on every tick
    Running,
    /// Race over (completion or stop); results can be displayed
    Finished,
}

/// Event payloads, tagged with the wire names the presentation layer and
/// persisted run records use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    GatePass { gate_id: String, points: u32 },
    GateMiss { gate_id: String, clipped_pole: bool },
    Collision { obstacle_id: String },
    ComboChange { combo: u32 },
    Start,
    Finish,
    Stop,
}

/// One entry in the append-only session event log. Timestamps are seconds
/// of session elapsed time, which keeps replays deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: f64,
}

/// The aggregate root: all state for one race, plus the tick entry point.
///
/// Lifecycle commands issued from a state that does not permit them are
/// silent no-ops; a double-tapped start button must never corrupt a
/// running session.
#[derive(Debug)]
pub struct RaceSession {
    state: RaceState,
    seed: i64,
    track: Track,
    vehicle: VehicleState,
    inputs: ControlInputs,
    resolver: ProximityResolver,
    scoreboard: Scoreboard,
    elapsed_time: f64,
    distance_traveled: f32,
    passed_gates: BTreeSet<String>,
    missed_gates: BTreeSet<String>,
    collided_obstacles: BTreeSet<String>,
    was_interrupted: bool,
    event_log: Vec<GameEvent>,
    /// Reused across ticks to keep the per-frame path allocation-free
    scratch_events: Vec<ProximityEvent>,
}

impl RaceSession {
    /// Create an idle session with a freshly generated seed
    pub fn new() -> Self {
        // Generated seeds are always in 0..1_000_000, a valid range
        Self::with_seed(generate_seed()).expect("generated seed is non-negative")
    }

    /// Create an idle session with a caller-supplied seed, for deterministic
    /// replay. Fails fast on an invalid seed; that is a programming error,
    /// not a runtime condition to recover from.
    pub fn with_seed(seed: i64) -> Result<Self, TrackError> {
        let track = track::generate(seed)?;
        Ok(Self {
            state: RaceState::Ready,
            seed,
            track,
            vehicle: VehicleState::default(),
            inputs: ControlInputs::default(),
            resolver: ProximityResolver::new(),
            scoreboard: Scoreboard::default(),
            elapsed_time: 0.0,
            distance_traveled: 0.0,
            passed_gates: BTreeSet::new(),
            missed_gates: BTreeSet::new(),
            collided_obstacles: BTreeSet::new(),
            was_interrupted: false,
            event_log: Vec::new(),
            scratch_events: Vec::new(),
        })
    }

    // --- Lifecycle commands ---

    /// Start request: ready -> countdown with a fresh seed and track.
    /// No-op in any other state.
    pub fn request_start(&mut self) {
        // Generated seeds are non-negative, so this cannot fail
        let _ = self.request_start_seeded(generate_seed());
    }

    /// Start request with an explicit seed, for reproducing a previous run
    pub fn request_start_seeded(&mut self, seed: i64) -> Result<(), TrackError> {
        if self.state != RaceState::Ready {
            return Ok(());
        }
        let track = track::generate(seed)?;
        debug!(
            "countdown started: seed={seed}, {} gates, {} obstacles",
            track.gates.len(),
            track.obstacles.len()
        );

        self.state = RaceState::Countdown;
        self.seed = seed;
        self.track = track;
        self.vehicle.reset();
        self.inputs = ControlInputs::default();
        self.resolver.reset();
        self.scoreboard = Scoreboard::default();
        self.elapsed_time = 0.0;
        self.distance_traveled = 0.0;
        self.passed_gates.clear();
        self.missed_gates.clear();
        self.collided_obstacles.clear();
        self.was_interrupted = false;
        self.event_log.clear();
        Ok(())
    }

    /// Countdown-complete signal from the presentation layer:
    /// countdown -> running. The countdown's duration and ticking are
    /// presentation concerns; the core only reacts to this trigger.
    pub fn confirm_countdown_complete(&mut self) {
        if self.state != RaceState::Countdown {
            return;
        }
        self.state = RaceState::Running;
        self.log_event(EventKind::Start);
        debug!("race started");
    }

    /// Explicit stop: running -> finished so results can be shown.
    /// `interrupted` marks an involuntary stop (e.g. visibility loss), as
    /// opposed to a deliberate "stop race" action.
    pub fn request_stop(&mut self, interrupted: bool) {
        if self.state != RaceState::Running {
            return;
        }
        if interrupted {
            self.was_interrupted = true;
        }
        self.state = RaceState::Finished;
        self.log_event(EventKind::Stop);
        debug!(
            "race stopped at {:.0} units (interrupted: {interrupted})",
            self.distance_traveled
        );
    }

    /// The host lost visibility while running. Flags the session as
    /// interrupted without changing state; if ticks keep coming the race
    /// keeps running, and the first tick after a stall is tamed by the
    /// dt clamp.
    pub fn notify_visibility_lost(&mut self) {
        if self.state == RaceState::Running {
            self.was_interrupted = true;
        }
    }

    /// Reset request: finished -> ready, discarding the session's results
    pub fn reset(&mut self) {
        if self.state == RaceState::Finished {
            self.state = RaceState::Ready;
        }
    }

    // --- Control inputs (clamped on write, read by physics each tick) ---

    pub fn set_throttle(&mut self, position: f32) {
        self.inputs.set_throttle(position);
    }

    pub fn set_brake(&mut self, position: f32) {
        self.inputs.set_brake(position);
    }

    pub fn set_steer(&mut self, value: f32) {
        self.inputs.set_steer(value);
    }

    // --- Tick ---

    /// Advance the simulation by one frame. No-op unless running.
    pub fn tick(&mut self, dt: f32) {
        if self.state != RaceState::Running {
            return;
        }
        let dt = dt.clamp(0.0, MAX_TICK_DT);
        self.elapsed_time += dt as f64;

        // Physics first: resolution below depends on the new position
        self.vehicle.advance(&self.inputs, dt);
        self.distance_traveled = self.vehicle.distance();

        let mut events = std::mem::take(&mut self.scratch_events);
        events.clear();
        self.resolver.resolve(&self.track, &self.vehicle, &mut events);
        for event in &events {
            self.apply_resolution(event);
        }
        self.scratch_events = events;

        // Finish check last, on the updated distance
        if self.distance_traveled >= TRACK_LENGTH {
            self.state = RaceState::Finished;
            self.log_event(EventKind::Finish);
            debug!(
                "race finished in {:.2}s, score {}",
                self.elapsed_time, self.scoreboard.score
            );
        }
    }

    fn apply_resolution(&mut self, event: &ProximityEvent) {
        match event {
            ProximityEvent::GatePass { gate_id } => {
                let points = self.scoreboard.apply_gate_pass();
                self.passed_gates.insert(gate_id.clone());
                trace!("gate {gate_id} passed for {points} points");
                self.log_event(EventKind::GatePass {
                    gate_id: gate_id.clone(),
                    points,
                });
                self.log_event(EventKind::ComboChange {
                    combo: self.scoreboard.combo,
                });
            }
            ProximityEvent::GateMiss {
                gate_id,
                clipped_pole,
            } => {
                let combo_changed = self.scoreboard.apply_gate_miss();
                self.missed_gates.insert(gate_id.clone());
                trace!("gate {gate_id} missed (pole clipped: {clipped_pole})");
                self.log_event(EventKind::GateMiss {
                    gate_id: gate_id.clone(),
                    clipped_pole: *clipped_pole,
                });
                if combo_changed {
                    self.log_event(EventKind::ComboChange { combo: 1 });
                }
            }
            ProximityEvent::Collision { obstacle_id } => {
                let combo_changed = self.scoreboard.apply_collision();
                self.collided_obstacles.insert(obstacle_id.clone());
                trace!("collision with {obstacle_id}");
                self.log_event(EventKind::Collision {
                    obstacle_id: obstacle_id.clone(),
                });
                if combo_changed {
                    self.log_event(EventKind::ComboChange { combo: 1 });
                }
            }
        }
    }

    fn log_event(&mut self, kind: EventKind) {
        self.event_log.push(GameEvent {
            kind,
            timestamp: self.elapsed_time,
        });
    }

    // --- Read-only snapshot ---

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// High-frequency vehicle pose, intended to be polled once per frame
    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn distance_traveled(&self) -> f32 {
        self.distance_traveled
    }

    pub fn speed(&self) -> f32 {
        self.vehicle.speed()
    }

    pub fn score(&self) -> u32 {
        self.scoreboard.score
    }

    pub fn combo(&self) -> u32 {
        self.scoreboard.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.scoreboard.max_combo
    }

    pub fn passed_gates(&self) -> &BTreeSet<String> {
        &self.passed_gates
    }

    pub fn missed_gates(&self) -> &BTreeSet<String> {
        &self.missed_gates
    }

    pub fn collided_obstacles(&self) -> &BTreeSet<String> {
        &self.collided_obstacles
    }

    pub fn was_interrupted(&self) -> bool {
        self.was_interrupted
    }

    pub fn event_log(&self) -> &[GameEvent] {
        &self.event_log
    }

    /// Whether the full course was covered (as opposed to an early stop)
    pub fn completed_course(&self) -> bool {
        self.distance_traveled >= TRACK_LENGTH
    }

    /// Build the persisted-run record for this session. `timestamp` is the
    /// wall-clock moment supplied by the caller; the core keeps no clock of
    /// its own.
    pub fn run_record(&self, timestamp: f64) -> RunRecord {
        RunRecord {
            timestamp,
            score: self.scoreboard.score,
            gates_cleared: self.passed_gates.len() as u32,
            gates_missed: self.missed_gates.len() as u32,
            collisions: self.collided_obstacles.len() as u32,
            max_combo: self.scoreboard.max_combo,
            duration: self.elapsed_time,
            distance: self.distance_traveled,
            completed: self.completed_course(),
            seed: self.seed,
            interrupted: self.was_interrupted,
            event_log: self.event_log.clone(),
        }
    }
}

impl Default for RaceSession {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_seed() -> i64 {
    rand::rng().random_range(0..1_000_000i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_session(seed: i64) -> RaceSession {
        let mut session = RaceSession::with_seed(seed).unwrap();
        session.request_start_seeded(seed).unwrap();
        session.confirm_countdown_complete();
        session
    }

    /// Steer toward the next unresolved gate's center
    fn autopilot_steer(session: &RaceSession) -> f32 {
        let vehicle = session.vehicle();
        session
            .track()
            .gates
            .iter()
            .filter(|g| g.course_position < vehicle.course_position)
            .find(|g| {
                !session.passed_gates().contains(&g.id) && !session.missed_gates().contains(&g.id)
            })
            .map(|g| (g.lateral_center - vehicle.lateral_position).clamp(-1.0, 1.0))
            .unwrap_or(0.0)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut session = RaceSession::with_seed(1).unwrap();
        assert_eq!(session.state(), RaceState::Ready);

        session.request_start();
        assert_eq!(session.state(), RaceState::Countdown);
        assert!(session.event_log().is_empty());

        session.confirm_countdown_complete();
        assert_eq!(session.state(), RaceState::Running);
        assert!(matches!(session.event_log()[0].kind, EventKind::Start));

        session.request_stop(false);
        assert_eq!(session.state(), RaceState::Finished);
        assert!(!session.was_interrupted());

        session.reset();
        assert_eq!(session.state(), RaceState::Ready);
    }

    #[test]
    fn test_out_of_state_commands_are_noops() {
        let mut session = running_session(7);
        let seed = session.seed();

        // Double-tapped start while running must not reset the session
        session.set_throttle(1.0);
        session.tick(0.1);
        let distance = session.distance_traveled();
        session.request_start();
        assert_eq!(session.state(), RaceState::Running);
        assert_eq!(session.seed(), seed);
        assert_eq!(session.distance_traveled(), distance);

        session.confirm_countdown_complete();
        assert_eq!(session.state(), RaceState::Running);

        // Reset only applies from finished
        session.reset();
        assert_eq!(session.state(), RaceState::Running);
    }

    #[test]
    fn test_tick_is_noop_unless_running() {
        let mut session = RaceSession::with_seed(3).unwrap();
        session.set_throttle(1.0);
        session.tick(0.1);
        assert_eq!(session.distance_traveled(), 0.0);
        assert_eq!(session.elapsed_time(), 0.0);

        session.request_start_seeded(3).unwrap();
        session.tick(0.1);
        assert_eq!(session.elapsed_time(), 0.0);
    }

    #[test]
    fn test_elapsed_time_uses_clamped_dt() {
        let mut session = running_session(5);
        session.tick(10.0);
        assert!((session.elapsed_time() - MAX_TICK_DT as f64).abs() < 1e-6);
    }

    #[test]
    fn test_stop_while_running_preserves_distance() {
        // Interrupted stop at 500 units: finished, flagged, distance kept,
        // stop is the last log entry
        let mut session = running_session(12345);
        session.vehicle.course_position = -500.0;
        session.distance_traveled = 500.0;

        session.request_stop(true);
        assert_eq!(session.state(), RaceState::Finished);
        assert!(session.was_interrupted());
        assert_eq!(session.distance_traveled(), 500.0);
        assert!(matches!(
            session.event_log().last().unwrap().kind,
            EventKind::Stop
        ));
    }

    #[test]
    fn test_visibility_loss_flags_without_stopping() {
        let mut session = running_session(9);
        session.notify_visibility_lost();
        assert_eq!(session.state(), RaceState::Running);
        assert!(session.was_interrupted());

        // Not running: no flag
        let mut idle = RaceSession::with_seed(9).unwrap();
        idle.notify_visibility_lost();
        assert!(!idle.was_interrupted());
    }

    #[test]
    fn test_finish_at_track_length() {
        let mut session = running_session(12345);
        session.set_throttle(1.0);

        let mut ticks = 0;
        while session.state() == RaceState::Running {
            let steer = autopilot_steer(&session);
            session.set_steer(steer);
            session.tick(0.1);
            ticks += 1;
            assert!(ticks < 10_000, "race never finished");
        }

        assert_eq!(session.state(), RaceState::Finished);
        assert!(session.distance_traveled() >= TRACK_LENGTH);
        assert!(session.completed_course());
        assert!(matches!(
            session.event_log().last().unwrap().kind,
            EventKind::Finish
        ));
        // Something happened on the way through
        assert!(!session.passed_gates().is_empty());
        assert!(session.score() > 0);
    }

    #[test]
    fn test_gate_sets_stay_disjoint_over_full_race() {
        let mut session = running_session(777);
        session.set_throttle(1.0);

        while session.state() == RaceState::Running {
            let steer = autopilot_steer(&session);
            session.set_steer(steer);
            session.tick(1.0 / 60.0);
        }

        for id in session.passed_gates() {
            assert!(!session.missed_gates().contains(id));
        }
        // Every generated gate resolved at most once
        let resolved = session.passed_gates().len() + session.missed_gates().len();
        assert!(resolved <= session.track().gates.len());
        assert!(session.max_combo() >= session.combo());
    }

    #[test]
    fn test_identical_seed_and_inputs_replay_identically() {
        let mut a = running_session(424242);
        let mut b = running_session(424242);

        for i in 0..2000 {
            let steer = if i % 120 < 60 { 0.4 } else { -0.4 };
            for session in [&mut a, &mut b] {
                session.set_throttle(1.0);
                session.set_steer(steer);
                session.tick(1.0 / 60.0);
            }
        }

        assert_eq!(a.state(), b.state());
        assert_eq!(a.score(), b.score());
        assert_eq!(a.max_combo(), b.max_combo());
        assert_eq!(a.distance_traveled(), b.distance_traveled());
        assert_eq!(a.event_log(), b.event_log());
    }

    #[test]
    fn test_restart_discards_previous_session() {
        let mut session = running_session(31337);
        session.set_throttle(1.0);
        for _ in 0..600 {
            session.tick(1.0 / 60.0);
        }
        session.request_stop(false);
        assert!(session.elapsed_time() > 0.0);

        session.reset();
        session.request_start_seeded(31338).unwrap();
        assert_eq!(session.state(), RaceState::Countdown);
        assert_eq!(session.seed(), 31338);
        assert_eq!(session.score(), 0);
        assert_eq!(session.combo(), 1);
        assert_eq!(session.max_combo(), 1);
        assert_eq!(session.distance_traveled(), 0.0);
        assert_eq!(session.elapsed_time(), 0.0);
        assert!(session.passed_gates().is_empty());
        assert!(session.event_log().is_empty());
        assert!(!session.was_interrupted());
        assert_eq!(session.vehicle().course_position, 0.0);
    }

    #[test]
    fn test_event_log_wire_format() {
        let mut session = running_session(1);
        session.vehicle.course_position = -500.0;
        session.distance_traveled = 500.0;
        session.request_stop(false);

        let json = serde_json::to_value(session.event_log()).unwrap();
        assert_eq!(json[0]["type"], "start");
        assert_eq!(json[1]["type"], "stop");
        assert!(json[1]["timestamp"].is_number());
    }

    #[test]
    fn test_run_record_fields() {
        let mut session = running_session(555);
        session.set_throttle(1.0);
        while session.state() == RaceState::Running {
            session.set_steer(autopilot_steer(&session));
            session.tick(0.1);
        }

        let record = session.run_record(1_700_000_000_000.0);
        assert_eq!(record.score, session.score());
        assert_eq!(record.gates_cleared as usize, session.passed_gates().len());
        assert_eq!(record.gates_missed as usize, session.missed_gates().len());
        assert_eq!(
            record.collisions as usize,
            session.collided_obstacles().len()
        );
        assert_eq!(record.seed, 555);
        assert!(record.completed);
        assert!(!record.interrupted);
        assert_eq!(record.event_log.len(), session.event_log().len());
    }
}
