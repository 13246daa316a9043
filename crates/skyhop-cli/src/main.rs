use std::process::ExitCode;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use skyhop_core::analytics::TracingAnalytics;
use skyhop_core::store::{JsonFileStore, KeyValueStore, MemoryStore};
use skyhop_sim::config::SimConfig;
use skyhop_sim::level::{LevelPack, LevelProvider};
use skyhop_sim::level_gen::GeneratedLevels;
use skyhop_sim::progression::SaveData;
use skyhop_sim::{LevelSession, Phase, SessionEvent};

/// Fixed simulation step.
const DT: f32 = 1.0 / 60.0;
/// Jump every this many ticks while running right.
const JUMP_PERIOD: u32 = 24;

#[derive(Debug, Serialize)]
struct Summary {
    ticks: u32,
    level: u32,
    phase: Phase,
    score: u32,
    gems_collected: u32,
    total_gems: u32,
    lives: u32,
    elapsed: f32,
    levels_completed: u32,
    deaths: u32,
    progress: SaveData,
}

/// Value of a `--name=value` argument, in any position.
fn arg(name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    std::env::args().find_map(|a| a.strip_prefix(&prefix).map(String::from))
}

fn flag(name: &str) -> bool {
    let flag = format!("--{name}");
    std::env::args().any(|a| a == flag)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match arg("config") {
        Some(path) => SimConfig::load_from(path),
        None => SimConfig::load(),
    };
    let seed = arg("seed").and_then(|s| s.parse::<u64>().ok()).unwrap_or(42);
    let start_level = arg("level").and_then(|s| s.parse::<u32>().ok()).unwrap_or(1);
    let max_ticks = arg("ticks").and_then(|s| s.parse::<u32>().ok()).unwrap_or(3600);
    let grant_unlocks = flag("grant-unlocks");

    let levels: Box<dyn LevelProvider> = match arg("levels") {
        Some(path) => match LevelPack::load(&path) {
            Ok(pack) => {
                tracing::info!(path = %path, levels = pack.len(), "Loaded level pack");
                Box::new(pack)
            },
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Failed to load level pack");
                return ExitCode::FAILURE;
            },
        },
        None => Box::new(GeneratedLevels::new(seed)),
    };

    let store: Box<dyn KeyValueStore> = match arg("save") {
        Some(path) => match JsonFileStore::open(&path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Save file unusable, progress will not persist");
                Box::new(MemoryStore::new())
            },
        },
        None => Box::new(MemoryStore::new()),
    };

    let mut session = LevelSession::new(config, levels, Box::new(TracingAnalytics), store);
    if !session.select_level(start_level) {
        tracing::error!(level = start_level, "Level not available");
        return ExitCode::FAILURE;
    }
    if let Phase::AwaitingUnlock { .. } = session.phase()
        && !(grant_unlocks && session.grant_reward_unlock())
    {
        tracing::error!(level = start_level, "Level is locked; pass --grant-unlocks to unlock it");
        return ExitCode::FAILURE;
    }

    let summary = run(&mut session, max_ticks, grant_unlocks);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode summary");
            ExitCode::FAILURE
        },
    }
}

/// Drive the session with a run-right-and-hop input track until the tick
/// budget runs out or the run ends.
fn run(session: &mut LevelSession, max_ticks: u32, grant_unlocks: bool) -> Summary {
    let mut ticks = 0;
    let mut levels_completed = 0;
    let mut deaths = 0;

    while ticks < max_ticks {
        match session.phase() {
            Phase::Playing => {},
            Phase::LevelComplete => {
                if !session.next_level() {
                    break;
                }
                continue;
            },
            Phase::AwaitingUnlock { .. } => {
                if grant_unlocks {
                    session.grant_reward_unlock();
                } else {
                    session.decline_unlock();
                    break;
                }
                continue;
            },
            Phase::GameOver { .. } | Phase::Paused | Phase::Loading => break,
        }

        session.set_move_dir(1.0);
        if ticks % JUMP_PERIOD == 0 {
            session.request_jump();
        }
        for event in session.update(DT) {
            match event {
                SessionEvent::LevelCompleted { score, .. } => {
                    levels_completed += 1;
                    tracing::info!(score, "Level cleared");
                },
                SessionEvent::PlayerDied { .. } => deaths += 1,
                _ => {},
            }
        }
        ticks += 1;
    }

    let run = session.run();
    Summary {
        ticks,
        level: session.level().id,
        phase: session.phase(),
        score: run.score,
        gems_collected: run.gems_collected,
        total_gems: run.total_gems,
        lives: run.lives,
        elapsed: run.elapsed,
        levels_completed,
        deaths,
        progress: session.progression().data().clone(),
    }
}
