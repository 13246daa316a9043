pub mod camera;
pub mod collision;
pub mod config;
pub mod entity;
pub mod level;
pub mod level_gen;
pub mod physics;
pub mod progression;
pub mod scoring;
pub mod snapshot;

use serde::{Deserialize, Serialize};

use skyhop_core::analytics::{AnalyticsEvent, AnalyticsEventKind, AnalyticsSink};
use skyhop_core::geom::Vec2;
use skyhop_core::store::KeyValueStore;

use collision::Contact;
use config::SimConfig;
use entity::{Player, World};
use level::{LevelConfig, LevelError, LevelProvider};
use progression::Progression;
use snapshot::{Hud, RenderSnapshot};

/// Why a level attempt ended without completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailCause {
    TimeUp,
    NoLivesRemaining,
}

impl FailCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeUp => "time_up",
            Self::NoLivesRemaining => "no_lives_remaining",
        }
    }
}

/// Session phase. `Loading` is both the initial phase and the menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Loading,
    Playing,
    Paused,
    LevelComplete,
    GameOver { cause: FailCause },
    /// Waiting on the host's rewarded-unlock flow for a locked level.
    AwaitingUnlock { level: u32 },
}

/// The checkpoint the player respawns at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMark {
    pub order: usize,
    pub position: Vec2,
}

/// Per-attempt bookkeeping, reset at each level load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub level_id: u32,
    pub score: u32,
    pub gems_collected: u32,
    pub total_gems: u32,
    pub elapsed: f32,
    pub time_limit: f32,
    pub lives: u32,
    pub checkpoint: Option<CheckpointMark>,
    pub phase: Phase,
}

impl RunState {
    fn new(level: &LevelConfig, lives: u32) -> Self {
        Self {
            level_id: level.id,
            score: 0,
            gems_collected: 0,
            total_gems: level.total_gems(),
            elapsed: 0.0,
            time_limit: level.time_limit,
            lives,
            checkpoint: None,
            phase: Phase::Loading,
        }
    }

    pub fn time_remaining(&self) -> f32 {
        (self.time_limit - self.elapsed).max(0.0)
    }
}

/// Something the host may want to react to (sound, UI), produced by the
/// session as it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    LevelStarted { level: u32, from_checkpoint: bool },
    GemCollected { value: u32, collected: u32 },
    PortalOpened,
    PlayerHurt { lives: u32 },
    CheckpointActivated { order: usize },
    PlayerDied { lives: u32 },
    LevelCompleted { score: u32, time_bonus: u32 },
    LevelFailed { cause: FailCause },
    Paused,
    Resumed,
    UnlockOffered { level: u32 },
    UnlockGranted { level: u32 },
    UnlockDeclined { level: u32 },
}

/// A level offered behind the rewarded-unlock flow.
struct PendingUnlock {
    level: LevelConfig,
    /// Phase to return to if the offer is declined.
    return_to: Phase,
}

/// One player's run through the level sequence: owns the loaded level, its
/// entities, the run bookkeeping and the injected collaborators.
pub struct LevelSession {
    config: SimConfig,
    levels: Box<dyn LevelProvider>,
    analytics: Box<dyn AnalyticsSink>,
    progression: Progression,
    level: LevelConfig,
    world: World,
    player: Player,
    run: RunState,
    move_dir: f32,
    jump_requested: bool,
    pending_unlock: Option<PendingUnlock>,
    events: Vec<SessionEvent>,
}

impl LevelSession {
    pub fn new(
        config: SimConfig,
        levels: Box<dyn LevelProvider>,
        analytics: Box<dyn AnalyticsSink>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid simulation config, using defaults");
                SimConfig::default()
            },
        };
        let progression = Progression::load(store, config.rules.free_level_threshold);
        let level = LevelConfig::fallback();
        let run = RunState::new(&level, config.rules.default_lives);
        let player = Player::new(level.start, config.physics.player_size());
        Self {
            config,
            levels,
            analytics,
            progression,
            level,
            world: World::empty(),
            player,
            run,
            move_dir: 0.0,
            jump_requested: false,
            pending_unlock: None,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.run.phase
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    // ---- Input ----

    /// Latch a jump for the next tick. Taps between ticks are not lost.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    pub fn set_move_dir(&mut self, dir: f32) {
        self.move_dir = dir;
    }

    // ---- Level lifecycle ----

    /// Load `config` and start playing it.
    ///
    /// An invalid level is replaced by [`LevelConfig::fallback`]; the
    /// validation error is still returned so the caller can report it.
    pub fn load_level(&mut self, config: LevelConfig) -> Result<(), LevelError> {
        self.run.phase = Phase::Loading;
        self.world.clear();
        match config.validate() {
            Ok(()) => {
                self.start_level(config);
                Ok(())
            },
            Err(e) => {
                tracing::error!(level = config.id, error = %e, "Invalid level, loading fallback");
                self.start_level(LevelConfig::fallback());
                Err(e)
            },
        }
    }

    /// Open a level from the menu. Locked levels go through the unlock offer.
    /// Returns false if the provider has no such level.
    pub fn select_level(&mut self, id: u32) -> bool {
        if self.run.phase != Phase::Loading {
            return false;
        }
        self.request_level(id)
    }

    /// Move on from a completed level to the next id.
    pub fn next_level(&mut self) -> bool {
        if self.run.phase != Phase::LevelComplete {
            return false;
        }
        self.request_level(self.level.id.saturating_add(1))
    }

    /// Reward-flow callback: the host granted the offered unlock.
    pub fn grant_reward_unlock(&mut self) -> bool {
        let Phase::AwaitingUnlock { level: id } = self.run.phase else {
            return false;
        };
        let Some(pending) = self.pending_unlock.take() else {
            return false;
        };
        self.progression.unlock(id);
        self.record(AnalyticsEvent::new(AnalyticsEventKind::RewardedUnlockGranted).with("level", id));
        self.events.push(SessionEvent::UnlockGranted { level: id });
        tracing::info!(level = id, "Level unlocked by reward");
        // An invalid level is logged and replaced by the fallback
        let _ = self.load_level(pending.level);
        true
    }

    /// Reward-flow callback: the player passed on the offer.
    pub fn decline_unlock(&mut self) {
        let Phase::AwaitingUnlock { level: id } = self.run.phase else {
            return;
        };
        let return_to = self
            .pending_unlock
            .take()
            .map_or(Phase::LevelComplete, |p| p.return_to);
        self.run.phase = return_to;
        self.record(AnalyticsEvent::new(AnalyticsEventKind::RewardedUnlockDeclined).with("level", id));
        self.events.push(SessionEvent::UnlockDeclined { level: id });
    }

    /// Replay the current level from scratch. Only a level that has been
    /// played can be restarted.
    pub fn restart_level(&mut self) -> bool {
        if !matches!(
            self.run.phase,
            Phase::Playing | Phase::Paused | Phase::LevelComplete | Phase::GameOver { .. }
        ) {
            return false;
        }
        self.world.clear();
        self.start_level(self.level.clone());
        true
    }

    /// Replay from the last checkpoint after a game over or from the pause
    /// menu. Score, gem tally and collected gems carry over; lives and the
    /// clock reset.
    pub fn retry_from_checkpoint(&mut self) -> bool {
        if !matches!(self.run.phase, Phase::GameOver { .. } | Phase::Paused) {
            return false;
        }
        let collected = std::mem::take(&mut self.world.collected);
        self.world = World::from_level(&self.level, &self.config.physics, &collected);
        let current = self.run.checkpoint;
        if let Some(mark) = current {
            for checkpoint in &mut self.world.checkpoints {
                checkpoint.activated = checkpoint.order <= mark.order;
            }
        }

        self.run.lives = self.config.rules.default_lives;
        self.run.elapsed = 0.0;
        let spawn = current.map_or(self.level.start, |c| c.position);
        self.player = Player::new(spawn, self.config.physics.player_size());
        self.clear_input();
        self.run.phase = Phase::Playing;

        self.record(
            AnalyticsEvent::new(AnalyticsEventKind::LevelStart)
                .with("level", self.level.id)
                .with("from_checkpoint", true),
        );
        self.events.push(SessionEvent::LevelStarted {
            level: self.level.id,
            from_checkpoint: true,
        });
        tracing::info!(level = self.level.id, "Retrying from checkpoint");
        true
    }

    pub fn pause(&mut self) {
        if self.run.phase == Phase::Playing {
            self.run.phase = Phase::Paused;
            self.events.push(SessionEvent::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.run.phase == Phase::Paused {
            self.run.phase = Phase::Playing;
            self.events.push(SessionEvent::Resumed);
        }
    }

    /// Leave the level for the menu.
    pub fn return_to_menu(&mut self) {
        if matches!(
            self.run.phase,
            Phase::Paused | Phase::LevelComplete | Phase::GameOver { .. } | Phase::AwaitingUnlock { .. }
        ) {
            self.world.clear();
            self.pending_unlock = None;
            self.clear_input();
            self.run.phase = Phase::Loading;
            tracing::info!("Returned to menu");
        }
    }

    // ---- Tick ----

    /// Advance the level by `dt` seconds.
    ///
    /// Does nothing outside `Playing`. Returns the events produced since the
    /// previous call, including those raised by lifecycle calls in between.
    pub fn update(&mut self, dt: f32) -> Vec<SessionEvent> {
        if self.run.phase == Phase::Playing && dt.is_finite() && dt > 0.0 {
            self.tick(dt);
        }
        std::mem::take(&mut self.events)
    }

    fn tick(&mut self, dt: f32) {
        self.run.elapsed += dt;
        if self.run.elapsed >= self.run.time_limit {
            self.fail(FailCause::TimeUp);
            return;
        }

        let displacements = self.world.advance_movers(dt);
        if let Some(index) = self.player.riding
            && let Some(delta) = displacements.get(index)
        {
            self.player.position += *delta;
        }

        let previous = self.player.position;
        if std::mem::take(&mut self.jump_requested) {
            physics::try_jump(&mut self.player, self.run.lives, &self.config.physics);
        }
        physics::integrate(&mut self.player, self.move_dir, &self.config.physics, dt);

        if self.player.position.y > self.level.height + self.config.rules.fall_death_margin {
            self.handle_player_death();
            physics::update_motion_state(&mut self.player);
            return;
        }

        let contacts = collision::resolve(&mut self.player, previous, &mut self.world);
        for contact in contacts {
            if self.run.phase != Phase::Playing {
                break;
            }
            self.apply_contact(contact);
        }
        physics::update_motion_state(&mut self.player);
    }

    fn apply_contact(&mut self, contact: Contact) {
        match contact {
            Contact::GemCollected { id, value } => {
                self.run.score = self.run.score.saturating_add(value);
                self.run.gems_collected += 1;
                debug_assert!(self.run.gems_collected <= self.run.total_gems);
                tracing::debug!(gem = id, value, "Gem collected");
                self.record(
                    AnalyticsEvent::new(AnalyticsEventKind::GemCollected)
                        .with("level", self.level.id)
                        .with("value", value)
                        .with("collected", self.run.gems_collected)
                        .with("total", self.run.total_gems),
                );
                self.events.push(SessionEvent::GemCollected {
                    value,
                    collected: self.run.gems_collected,
                });
                if self.run.gems_collected == self.run.total_gems && !self.world.portal.active {
                    self.world.portal.active = true;
                    self.events.push(SessionEvent::PortalOpened);
                }
            },
            Contact::HazardHit { index, damage } => {
                if self.player.is_invulnerable() {
                    return;
                }
                self.run.lives = self.run.lives.saturating_sub(damage);
                tracing::debug!(hazard = index, damage, lives = self.run.lives, "Player hurt");
                self.events.push(SessionEvent::PlayerHurt {
                    lives: self.run.lives,
                });
                if self.run.lives == 0 {
                    self.record_death("hazard");
                    self.events.push(SessionEvent::PlayerDied { lives: 0 });
                    self.fail(FailCause::NoLivesRemaining);
                    return;
                }
                self.player
                    .invulnerability
                    .start(self.config.rules.invulnerability_secs);
                self.player.velocity.y = self.config.rules.knockback_velocity;
                self.player.on_ground = false;
                self.player.riding = None;
            },
            Contact::CheckpointReached { order } => {
                if self.run.checkpoint.is_some_and(|c| order <= c.order) {
                    return;
                }
                let Some(checkpoint) = self.world.checkpoints.iter_mut().find(|c| c.order == order)
                else {
                    return;
                };
                checkpoint.activated = true;
                let mark = CheckpointMark {
                    order,
                    position: checkpoint.position,
                };
                debug_assert!(self.run.checkpoint.is_none_or(|c| c.order < mark.order));
                self.run.checkpoint = Some(mark);
                tracing::debug!(order, "Checkpoint activated");
                self.record(
                    AnalyticsEvent::new(AnalyticsEventKind::CheckpointActivated)
                        .with("level", self.level.id)
                        .with("checkpoint", order),
                );
                self.events.push(SessionEvent::CheckpointActivated { order });
            },
            Contact::PortalReached => {
                self.handle_level_complete();
            },
        }
    }

    /// The player fell out of the level. Costs a life; respawns at the
    /// current checkpoint (or the level start) unless none remain.
    pub fn handle_player_death(&mut self) {
        if self.run.phase != Phase::Playing {
            return;
        }
        self.run.lives = self.run.lives.saturating_sub(1);
        self.record_death("fall");
        self.events.push(SessionEvent::PlayerDied {
            lives: self.run.lives,
        });
        if self.run.lives == 0 {
            self.fail(FailCause::NoLivesRemaining);
            return;
        }
        let spawn = self.run.checkpoint.map_or(self.level.start, |c| c.position);
        self.player.respawn(spawn);
        self.player
            .invulnerability
            .start(self.config.rules.invulnerability_secs);
        tracing::debug!(lives = self.run.lives, x = spawn.x, y = spawn.y, "Player respawned");
    }

    /// Finish the level: add the time bonus, record progress. Refused while
    /// gems remain.
    pub fn handle_level_complete(&mut self) -> bool {
        if self.run.phase != Phase::Playing || self.run.gems_collected < self.run.total_gems {
            return false;
        }
        let bonus = scoring::time_bonus(
            self.run.time_limit,
            self.run.elapsed,
            self.config.rules.bonus_rate,
        );
        self.run.score = self.run.score.saturating_add(bonus);
        self.run.phase = Phase::LevelComplete;
        self.progression
            .record_completion(self.level.id, self.run.score, self.run.gems_collected);

        self.record(
            AnalyticsEvent::new(AnalyticsEventKind::LevelComplete)
                .with("level", self.level.id)
                .with("score", self.run.score)
                .with("time_bonus", bonus)
                .with("gems", self.run.gems_collected)
                .with("elapsed", self.run.elapsed),
        );
        self.events.push(SessionEvent::LevelCompleted {
            score: self.run.score,
            time_bonus: bonus,
        });
        tracing::info!(
            level = self.level.id,
            score = self.run.score,
            elapsed = self.run.elapsed,
            "Level complete"
        );
        true
    }

    // ---- Render host ----

    pub fn snapshot(&self) -> RenderSnapshot {
        let hud = Hud {
            level_id: self.level.id,
            score: self.run.score,
            gems_collected: self.run.gems_collected,
            total_gems: self.run.total_gems,
            lives: self.run.lives,
            time_remaining: self.run.time_remaining(),
            phase: self.run.phase,
        };
        RenderSnapshot::capture(self.level_extent(), &self.player, &self.world, hud)
    }

    /// MessagePack-encoded [`snapshot`](Self::snapshot).
    pub fn encode_snapshot(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        snapshot::encode_snapshot(&self.snapshot())
    }

    /// Camera center that keeps the player in view without showing past the
    /// level edges.
    pub fn camera_focus(&self, viewport_half: Vec2) -> Vec2 {
        camera::camera_focus(self.player.bounds().center(), viewport_half, self.level_extent())
    }

    pub fn level_extent(&self) -> Vec2 {
        Vec2::new(self.level.width, self.level.height)
    }

    // ---- Internals ----

    fn request_level(&mut self, id: u32) -> bool {
        let Some(level) = self.levels.level(id) else {
            tracing::warn!(level = id, "Requested level is unavailable");
            return false;
        };
        if self.progression.is_unlocked(id) {
            let _ = self.load_level(level);
            return true;
        }
        self.pending_unlock = Some(PendingUnlock {
            level,
            return_to: self.run.phase,
        });
        self.run.phase = Phase::AwaitingUnlock { level: id };
        self.record(AnalyticsEvent::new(AnalyticsEventKind::RewardedUnlockOffered).with("level", id));
        self.events.push(SessionEvent::UnlockOffered { level: id });
        tracing::info!(level = id, "Level locked, offering rewarded unlock");
        true
    }

    /// Instantiate a validated level and enter `Playing`.
    fn start_level(&mut self, level: LevelConfig) {
        self.world = World::from_level(&level, &self.config.physics, &[]);
        self.player = Player::new(level.start, self.config.physics.player_size());
        self.run = RunState::new(&level, self.config.rules.default_lives);
        self.pending_unlock = None;
        self.clear_input();
        self.level = level;
        self.run.phase = Phase::Playing;

        self.record(
            AnalyticsEvent::new(AnalyticsEventKind::LevelStart)
                .with("level", self.level.id)
                .with("name", self.level.name.clone())
                .with("total_gems", self.run.total_gems)
                .with("time_limit", self.run.time_limit),
        );
        self.events.push(SessionEvent::LevelStarted {
            level: self.level.id,
            from_checkpoint: false,
        });
        tracing::info!(level = self.level.id, name = %self.level.name, "Level started");
    }

    fn fail(&mut self, cause: FailCause) {
        self.run.phase = Phase::GameOver { cause };
        self.record(
            AnalyticsEvent::new(AnalyticsEventKind::LevelFail)
                .with("level", self.level.id)
                .with("cause", cause.as_str())
                .with("score", self.run.score)
                .with("elapsed", self.run.elapsed),
        );
        self.events.push(SessionEvent::LevelFailed { cause });
        tracing::info!(level = self.level.id, cause = cause.as_str(), "Level failed");
    }

    fn record_death(&mut self, cause: &str) {
        self.record(
            AnalyticsEvent::new(AnalyticsEventKind::PlayerDeath)
                .with("level", self.level.id)
                .with("cause", cause)
                .with("lives", self.run.lives),
        );
    }

    fn record(&mut self, event: AnalyticsEvent) {
        self.analytics.record(&event);
    }

    fn clear_input(&mut self) {
        self.move_dir = 0.0;
        self.jump_requested = false;
    }
}
