//! Headless demo race
//!
//! Runs one full race with a simple autopilot (full throttle, steering
//! toward the next unresolved gate) and prints the resulting run record as
//! JSON. Useful as a smoke test and for verifying determinism: the same
//! `--seed` always reproduces the same run.
//!
//! Usage: `tunnel-sprint [--seed N]`

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use tunnel_sprint::run_record::format_race_time;
use tunnel_sprint::sim::{RaceSession, RaceState};

const DEMO_DT: f32 = 1.0 / 60.0;

fn main() -> ExitCode {
    env_logger::init();

    let seed = match parse_seed_arg() {
        Ok(seed) => seed,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: tunnel-sprint [--seed N]");
            return ExitCode::FAILURE;
        }
    };

    let mut session = RaceSession::new();
    match seed {
        Some(seed) => {
            if let Err(err) = session.request_start_seeded(seed) {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
        None => session.request_start(),
    }
    info!("racing seed {}", session.seed());
    session.confirm_countdown_complete();

    // Autopilot: flat out, aim for the middle of the next gate
    session.set_throttle(1.0);
    while session.state() == RaceState::Running {
        let steer = steer_toward_next_gate(&session);
        session.set_steer(steer);
        session.tick(DEMO_DT);
    }

    info!(
        "finished in {} | score {} | gates {}/{} | max combo x{}",
        format_race_time(session.elapsed_time()),
        session.score(),
        session.passed_gates().len(),
        session.track().gates.len(),
        session.max_combo()
    );

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0);
    let record = session.run_record(timestamp);
    match serde_json::to_string_pretty(&record) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to serialize run record: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Proportional steering toward the next gate the car has not yet resolved
fn steer_toward_next_gate(session: &RaceSession) -> f32 {
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

fn parse_seed_arg() -> Result<Option<i64>, String> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        None => Ok(None),
        Some(flag) if flag == "--seed" => {
            let value = args
                .next()
                .ok_or_else(|| "--seed requires a value".to_string())?;
            let seed: i64 = value
                .parse()
                .map_err(|_| format!("invalid seed: {value}"))?;
            Ok(Some(seed))
        }
        Some(other) => Err(format!("unknown argument: {other}")),
    }
}
