//! End-to-end runs of a `LevelSession` through whole level attempts.

use proptest::prelude::*;

use skyhop_core::analytics::{AnalyticsEventKind, NullAnalytics};
use skyhop_core::geom::Vec2;
use skyhop_core::store::{JsonFileStore, MemoryStore};
use skyhop_core::test_helpers::RecordingAnalytics;
use skyhop_sim::config::SimConfig;
use skyhop_sim::level::{LevelConfig, LevelPack, LevelProvider};
use skyhop_sim::level_gen::GeneratedLevels;
use skyhop_sim::{FailCause, LevelSession, Phase, SessionEvent};

const FLOOR_Y: f32 = 500.0;
const DT: f32 = 1.0 / 60.0;

/// A wide level with one floor the player spawns standing on. The floor is
/// thick so that even long ticks cannot carry the player through it.
fn flat_level(id: u32) -> LevelConfig {
    LevelConfig::new(
        id,
        3000.0,
        2000.0,
        Vec2::new(0.0, FLOOR_Y - 48.0),
        Vec2::new(2900.0, FLOOR_Y - 64.0),
        90.0,
    )
    .with_platform(Vec2::new(0.0, FLOOR_Y), Vec2::new(3000.0, 1000.0))
}

fn session(config: SimConfig, level: LevelConfig) -> (LevelSession, RecordingAnalytics) {
    let recorder = RecordingAnalytics::new();
    let mut session = LevelSession::new(
        config,
        Box::new(LevelPack::default()),
        Box::new(recorder.clone()),
        Box::new(MemoryStore::new()),
    );
    session.load_level(level).unwrap();
    (session, recorder)
}

fn tick_n(session: &mut LevelSession, n: usize, dt: f32) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(session.update(dt));
    }
    events
}

/// Tick until the session leaves `Playing`, up to `max` ticks.
fn tick_until_done(session: &mut LevelSession, max: usize, dt: f32) -> Vec<(usize, SessionEvent)> {
    let mut events = Vec::new();
    for i in 0..max {
        events.extend(session.update(dt).into_iter().map(|e| (i, e)));
        if session.phase() != Phase::Playing {
            break;
        }
    }
    events
}

#[test]
fn scenario_a_collect_all_and_exit() {
    // Ten units of travel per half-second tick
    let mut config = SimConfig::default();
    config.physics.move_speed = 20.0;
    let mut level = flat_level(1)
        .with_gem(Vec2::new(100.0, FLOOR_Y - 30.0), 10)
        .with_gem(Vec2::new(200.0, FLOOR_Y - 30.0), 10)
        .with_gem(Vec2::new(300.0, FLOOR_Y - 30.0), 10);
    // Player's right edge first passes 625 on tick 60 (t = 30 s)
    level.exit = Vec2::new(625.0, FLOOR_Y - 64.0);
    let (mut session, recorder) = session(config, level);

    session.set_move_dir(1.0);
    let events = tick_until_done(&mut session, 200, 0.5);

    assert_eq!(session.phase(), Phase::LevelComplete);
    assert_eq!(session.run().elapsed, 30.0);
    assert_eq!(session.run().gems_collected, 3);
    let expected = 30 + (60.0f32 * session.config().rules.bonus_rate).round() as u32;
    assert_eq!(session.run().score, expected);
    assert_eq!(expected, 630);

    let (tick, completed) = events.last().unwrap();
    assert_eq!(*tick, 59);
    assert_eq!(
        *completed,
        SessionEvent::LevelCompleted {
            score: 630,
            time_bonus: 600
        }
    );
    assert_eq!(recorder.count(AnalyticsEventKind::GemCollected), 3);
    assert_eq!(recorder.count(AnalyticsEventKind::LevelComplete), 1);
    assert_eq!(session.progression().data().total_gems, 3);
}

#[test]
fn scenario_b_three_hits_end_the_run() {
    let config = SimConfig::default();
    let window = config.rules.invulnerability_secs;
    // Spike strip under the spawn point; the player keeps landing in it
    let level = flat_level(1).with_hazard(Vec2::new(0.0, FLOOR_Y - 16.0), Vec2::new(32.0, 16.0));
    let (mut session, recorder) = session(config, level);

    let events = tick_until_done(&mut session, 2000, DT);

    let hurts: Vec<(usize, u32)> = events
        .iter()
        .filter_map(|(tick, e)| match e {
            SessionEvent::PlayerHurt { lives } => Some((*tick, *lives)),
            _ => None,
        })
        .collect();
    let lives: Vec<u32> = hurts.iter().map(|(_, l)| *l).collect();
    assert_eq!(lives, vec![2, 1, 0]);
    for pair in hurts.windows(2) {
        let gap = (pair[1].0 - pair[0].0) as f32 * DT;
        assert!(gap >= window - DT, "hit inside the invulnerability window");
    }

    assert_eq!(
        session.phase(),
        Phase::GameOver {
            cause: FailCause::NoLivesRemaining
        }
    );
    // Game over lands on the same tick as the third hit
    let (last_hurt_tick, _) = hurts[2];
    assert!(events.iter().any(|(tick, e)| *tick == last_hurt_tick
        && *e
            == SessionEvent::LevelFailed {
                cause: FailCause::NoLivesRemaining
            }));
    assert_eq!(recorder.count(AnalyticsEventKind::PlayerDeath), 1);
    assert_eq!(recorder.count(AnalyticsEventKind::LevelFail), 1);
}

#[test]
fn scenario_c_time_runs_out_mid_air() {
    let mut level = flat_level(1);
    level.platforms.clear();
    level.start = Vec2::new(100.0, 100.0);
    level.time_limit = 1.0;
    let (mut session, recorder) = session(SimConfig::default(), level);

    session.update(0.5);
    assert_eq!(session.phase(), Phase::Playing);
    let velocity = session.player().velocity;
    let position = session.player().position;

    let events = session.update(0.5);

    assert_eq!(
        session.phase(),
        Phase::GameOver {
            cause: FailCause::TimeUp
        }
    );
    assert_eq!(
        events,
        vec![SessionEvent::LevelFailed {
            cause: FailCause::TimeUp
        }]
    );
    assert_eq!(session.player().velocity, velocity, "no gravity on the final tick");
    assert_eq!(session.player().position, position);
    let fail = &recorder.of_kind(AnalyticsEventKind::LevelFail)[0];
    assert_eq!(fail.param("cause"), Some(&serde_json::json!("time_up")));
}

#[test]
fn scenario_d_restart_resets_everything() {
    let level = flat_level(1)
        .with_gem(Vec2::new(60.0, FLOOR_Y - 30.0), 10)
        .with_gem(Vec2::new(160.0, FLOOR_Y - 30.0), 10)
        .with_gem(Vec2::new(2000.0, FLOOR_Y - 30.0), 10)
        .with_hazard(Vec2::new(300.0, FLOOR_Y - 16.0), Vec2::new(32.0, 16.0));
    let (mut session, _) = session(SimConfig::default(), level);

    session.set_move_dir(1.0);
    tick_n(&mut session, 90, DT);
    assert_eq!(session.run().score, 20);
    assert_eq!(session.run().lives, 2);

    assert!(session.restart_level());

    let run = session.run();
    assert_eq!(run.score, 0);
    assert_eq!(run.gems_collected, 0);
    assert_eq!(run.lives, session.config().rules.default_lives);
    assert_eq!(run.elapsed, 0.0);
    assert!(run.checkpoint.is_none());
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.player().position, Vec2::new(0.0, FLOOR_Y - 48.0));
    assert_eq!(session.world().gems.len(), 3);

    // Restart also drops held input
    session.update(DT);
    assert_eq!(session.player().position.x, 0.0);
}

#[test]
fn checkpoints_never_move_backwards() {
    let level = flat_level(1)
        .with_checkpoint(Vec2::new(1000.0, FLOOR_Y - 64.0))
        .with_checkpoint(Vec2::new(200.0, FLOOR_Y - 64.0))
        .with_checkpoint(Vec2::new(600.0, FLOOR_Y - 64.0));
    let (mut session, _) = session(SimConfig::default(), level);

    let mut events = Vec::new();
    session.set_move_dir(1.0);
    while session.player().position.x < 1100.0 {
        events.extend(session.update(DT));
    }
    session.set_move_dir(-1.0);
    while session.player().position.x > 150.0 {
        events.extend(session.update(DT));
    }

    let activated: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::CheckpointActivated { order } => Some(*order),
            _ => None,
        })
        .collect();
    assert_eq!(activated, vec![0, 1, 2]);
    assert_eq!(session.run().checkpoint.map(|c| c.order), Some(2));
    assert_eq!(
        session.run().checkpoint.map(|c| c.position.x),
        Some(1000.0)
    );
}

#[test]
fn portal_opens_only_after_every_gem() {
    let mut level = flat_level(1).with_gem(Vec2::new(1200.0, FLOOR_Y - 30.0), 10);
    level.exit = Vec2::new(300.0, FLOOR_Y - 64.0);
    let (mut session, _) = session(SimConfig::default(), level);

    // Run straight through the closed portal to the gem
    session.set_move_dir(1.0);
    while session.run().gems_collected == 0 {
        session.update(DT);
        assert_eq!(session.phase(), Phase::Playing);
    }
    assert!(session.world().portal.active);

    // Come back through the now-open portal
    session.set_move_dir(-1.0);
    let events = tick_until_done(&mut session, 1000, DT);
    assert_eq!(session.phase(), Phase::LevelComplete);
    assert!(
        events
            .iter()
            .any(|(_, e)| matches!(e, SessionEvent::LevelCompleted { .. }))
    );
}

#[test]
fn progress_survives_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");

    let mut level = flat_level(2).with_gem(Vec2::new(10.0, FLOOR_Y - 30.0), 10);
    level.exit = level.start;
    let pack = || LevelPack::new(vec![level.clone()]).unwrap();

    let mut first = LevelSession::new(
        SimConfig::default(),
        Box::new(pack()),
        Box::new(NullAnalytics),
        Box::new(JsonFileStore::open(&path).unwrap()),
    );
    assert!(first.select_level(2));
    first.update(DT);
    assert_eq!(first.phase(), Phase::LevelComplete);
    let score = first.run().score;

    let second = LevelSession::new(
        SimConfig::default(),
        Box::new(pack()),
        Box::new(NullAnalytics),
        Box::new(JsonFileStore::open(&path).unwrap()),
    );
    let saved = second.progression().data();
    assert_eq!(saved.highest_level, 2);
    assert_eq!(saved.total_gems, 1);
    assert_eq!(saved.total_score, u64::from(score));
}

#[test]
fn generated_levels_play_without_incident() {
    let mut levels = GeneratedLevels::new(42).with_count(5);
    for id in 1..=5 {
        let level = levels.level(id).unwrap();
        let total = level.total_gems();
        let (mut session, _) = session(SimConfig::default(), level);
        session.set_move_dir(1.0);
        for i in 0..1200 {
            if i % 20 == 0 {
                session.request_jump();
            }
            session.update(DT);
            assert!(session.player().position.is_finite());
            assert!(session.run().gems_collected <= total);
        }
    }
}

/// Held input for a number of ticks.
fn input_strategy() -> impl Strategy<Value = Vec<(i8, bool, usize)>> {
    proptest::collection::vec((-1i8..=1, any::<bool>(), 1usize..30), 1..40)
}

fn gem_field() -> LevelConfig {
    let mut level = flat_level(1)
        .with_platform(Vec2::new(300.0, FLOOR_Y - 100.0), Vec2::new(200.0, 16.0))
        .with_moving_platform(
            Vec2::new(700.0, FLOOR_Y - 120.0),
            Vec2::new(96.0, 16.0),
            Vec2::new(900.0, FLOOR_Y - 120.0),
            80.0,
        )
        .with_checkpoint(Vec2::new(250.0, FLOOR_Y - 64.0))
        .with_checkpoint(Vec2::new(650.0, FLOOR_Y - 64.0));
    for i in 0..12 {
        let x = 40.0 + i as f32 * 70.0;
        let y = if i % 2 == 0 { FLOOR_Y - 30.0 } else { FLOOR_Y - 150.0 };
        level = level.with_gem(Vec2::new(x, y), 10);
    }
    level.start = Vec2::new(400.0, FLOOR_Y - 48.0);
    level
}

proptest! {
    #[test]
    fn gem_tally_never_exceeds_total(inputs in input_strategy()) {
        let level = gem_field();
        let total = level.total_gems();
        let (mut session, _) = session(SimConfig::default(), level);

        for (dir, jump, hold) in inputs {
            session.set_move_dir(f32::from(dir));
            if jump {
                session.request_jump();
            }
            for _ in 0..hold {
                session.update(DT);
                let run = session.run();
                prop_assert!(run.gems_collected <= total);
                prop_assert_eq!(run.gems_collected as usize, session.world().collected.len());
                prop_assert_eq!(
                    run.gems_collected as usize + session.world().gems.len(),
                    total as usize
                );
                if run.phase != Phase::LevelComplete {
                    prop_assert_eq!(run.score, run.gems_collected * 10);
                }
            }
        }
    }

    #[test]
    fn checkpoint_order_is_monotonic(inputs in input_strategy()) {
        let (mut session, _) = session(SimConfig::default(), gem_field());
        let mut best: Option<usize> = None;

        for (dir, jump, hold) in inputs {
            session.set_move_dir(f32::from(dir));
            if jump {
                session.request_jump();
            }
            for _ in 0..hold {
                session.update(DT);
                let current = session.run().checkpoint.map(|c| c.order);
                prop_assert!(current >= best, "checkpoint went from {best:?} to {current:?}");
                best = current;
            }
        }
    }
}

#[test]
fn shipped_config_matches_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/skyhop.toml");
    assert_eq!(SimConfig::load_from(path), SimConfig::default());
}

#[test]
fn shipped_level_pack_loads_and_plays() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/levels.toml");
    let mut pack = LevelPack::load(path).unwrap();
    assert_eq!(pack.len(), 3);
    assert_eq!(pack.first_id(), Some(1));

    let (mut session, _) = session(SimConfig::default(), pack.level(2).unwrap());
    assert_eq!(session.run().total_gems, 2);
    session.set_move_dir(1.0);
    tick_n(&mut session, 120, DT);
    assert!(session.player().on_ground);
}
