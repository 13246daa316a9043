use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skyhop_core::geom::Vec2;

use crate::level::{LevelConfig, LevelProvider, MotionSpec};

/// Width of one procedural section in level units.
const CHUNK_WIDTH: f32 = 320.0;
/// Level height in level units.
pub const LEVEL_HEIGHT: f32 = 540.0;
/// Top edge of the ground floor.
pub const FLOOR_Y: f32 = 480.0;
const FLOOR_THICKNESS: f32 = 60.0;
const MIN_CHUNKS: u32 = 6;
const MAX_EXTRA_CHUNKS: u32 = 6;
/// Levels past this id all play at full difficulty.
const DIFFICULTY_RAMP: u32 = 10;
const GEM_VALUE: u32 = 10;
/// A checkpoint every this many chunks.
const CHECKPOINT_SPACING: u32 = 3;

/// Difficulty in `[0, 1]` for a level id; grows linearly until
/// `DIFFICULTY_RAMP`, then stays flat.
pub fn difficulty(id: u32) -> f32 {
    (id.saturating_sub(1) as f32 / DIFFICULTY_RAMP as f32).min(1.0)
}

/// Infinite (or capped) procedurally generated level sequence.
#[derive(Debug, Clone)]
pub struct GeneratedLevels {
    seed: u64,
    count: Option<u32>,
}

impl GeneratedLevels {
    pub fn new(seed: u64) -> Self {
        Self { seed, count: None }
    }

    /// Stop after `count` levels.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl LevelProvider for GeneratedLevels {
    fn level(&mut self, id: u32) -> Option<LevelConfig> {
        if id == 0 || self.count.is_some_and(|count| id > count) {
            return None;
        }
        Some(generate_level(self.seed, id))
    }

    fn level_count(&self) -> Option<u32> {
        self.count
    }
}

/// Generate a deterministic level from a seed and level id.
///
/// The layout is a run of fixed-width chunks along a ground floor: a flat
/// spawn chunk, patterned middle chunks, and a flat exit chunk. Higher ids
/// get more chunks, wider pits, faster movers and less spare time.
pub fn generate_level(seed: u64, id: u32) -> LevelConfig {
    let mut rng = StdRng::seed_from_u64(seed ^ u64::from(id).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let difficulty = difficulty(id);
    let chunks = MIN_CHUNKS + (difficulty * MAX_EXTRA_CHUNKS as f32).round() as u32;
    let width = chunks as f32 * CHUNK_WIDTH;
    let time_limit = (chunks as f32 * (8.0 - 3.0 * difficulty)).round();

    let mut level = LevelConfig::new(
        id,
        width,
        LEVEL_HEIGHT,
        Vec2::new(48.0, FLOOR_Y - 96.0),
        Vec2::new(width - 96.0, FLOOR_Y - 64.0),
        time_limit,
    )
    .named(format!("Skyhop {id}"));

    // Spawn chunk
    level = solid_floor(level, 0.0, CHUNK_WIDTH).with_gem(Vec2::new(200.0, FLOOR_Y - 40.0), GEM_VALUE);

    for chunk_idx in 1..chunks - 1 {
        let base_x = chunk_idx as f32 * CHUNK_WIDTH;
        level = generate_chunk(level, &mut rng, base_x, difficulty);
        if chunk_idx % CHECKPOINT_SPACING == 0 {
            // Every pattern keeps floor under the chunk's first 64 units
            level = level.with_checkpoint(Vec2::new(base_x + 16.0, FLOOR_Y - 64.0));
        }
    }

    // Exit chunk
    solid_floor(level, (chunks - 1) as f32 * CHUNK_WIDTH, CHUNK_WIDTH)
}

fn solid_floor(level: LevelConfig, x: f32, width: f32) -> LevelConfig {
    if width <= 0.0 {
        return level;
    }
    level.with_platform(Vec2::new(x, FLOOR_Y), Vec2::new(width, FLOOR_THICKNESS))
}

/// Floor across the chunk with a gap of `pit_width` starting `pit_start` in.
fn floor_with_pit(level: LevelConfig, base_x: f32, pit_start: f32, pit_width: f32) -> LevelConfig {
    let level = solid_floor(level, base_x, pit_start);
    let resume = pit_start + pit_width;
    solid_floor(level, base_x + resume, CHUNK_WIDTH - resume)
}

fn generate_chunk(level: LevelConfig, rng: &mut StdRng, base_x: f32, difficulty: f32) -> LevelConfig {
    // Moving hazards only show up once the curve has ramped a little
    let patterns = if difficulty >= 0.3 { 5u8 } else { 4 };
    match rng.random_range(0..patterns) {
        0 => {
            // Pit to jump, gem above it
            let pit_start = rng.random_range(96.0f32..160.0);
            let pit_width = 48.0 + 80.0 * difficulty * rng.random_range(0.5f32..1.0);
            floor_with_pit(level, base_x, pit_start, pit_width).with_gem(
                Vec2::new(base_x + pit_start + pit_width / 2.0 - 12.0, FLOOR_Y - 120.0),
                GEM_VALUE,
            )
        },
        1 => {
            // Raised ledge with a gem on top
            let ledge_y = FLOOR_Y - rng.random_range(80.0f32..130.0);
            let ledge_x = base_x + rng.random_range(64.0f32..160.0);
            solid_floor(level, base_x, CHUNK_WIDTH)
                .with_platform(Vec2::new(ledge_x, ledge_y), Vec2::new(128.0, 16.0))
                .with_gem(Vec2::new(ledge_x + 52.0, ledge_y - 40.0), GEM_VALUE)
        },
        2 => {
            // Wide pit bridged by a moving platform
            let speed = 40.0 + 80.0 * difficulty;
            let lift_y = FLOOR_Y - 48.0;
            floor_with_pit(level, base_x, 80.0, 160.0)
                .with_moving_platform(
                    Vec2::new(base_x + 72.0, lift_y),
                    Vec2::new(96.0, 16.0),
                    Vec2::new(base_x + 152.0, lift_y),
                    speed,
                )
                .with_gem(Vec2::new(base_x + 148.0, lift_y - 72.0), GEM_VALUE)
        },
        3 => {
            // Spike strip on the floor, safe ledge above it
            let strip_x = base_x + rng.random_range(80.0f32..160.0);
            let strip_width = 48.0 + 48.0 * difficulty;
            solid_floor(level, base_x, CHUNK_WIDTH)
                .with_hazard(
                    Vec2::new(strip_x, FLOOR_Y - 16.0),
                    Vec2::new(strip_width, 16.0),
                )
                .with_platform(
                    Vec2::new(strip_x - 16.0, FLOOR_Y - 96.0),
                    Vec2::new(strip_width + 32.0, 16.0),
                )
                .with_gem(Vec2::new(strip_x + strip_width / 2.0 - 12.0, FLOOR_Y - 136.0), GEM_VALUE)
        },
        _ => {
            // Patrolling hazard along the floor
            let from = base_x + 96.0;
            let mut level = solid_floor(level, base_x, CHUNK_WIDTH)
                .with_hazard(Vec2::new(from, FLOOR_Y - 24.0), Vec2::new(24.0, 24.0))
                .with_gem(Vec2::new(base_x + 160.0, FLOOR_Y - 140.0), GEM_VALUE);
            if let Some(hazard) = level.hazards.last_mut() {
                hazard.motion = Some(MotionSpec {
                    end: Vec2::new(from + 128.0, FLOOR_Y - 24.0),
                    speed: 60.0 + 60.0 * difficulty,
                });
            }
            level
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_generation() {
        assert_eq!(generate_level(42, 3), generate_level(42, 3));
    }

    #[test]
    fn different_seeds_different_levels() {
        let differs = (1..=5).any(|id| generate_level(42, id) != generate_level(123, id));
        assert!(differs, "different seeds should produce different levels");
    }

    #[test]
    fn generated_levels_validate() {
        for seed in [0, 1, 42, 9001, u64::MAX] {
            for id in 1..=25 {
                let level = generate_level(seed, id);
                level
                    .validate()
                    .unwrap_or_else(|e| panic!("seed {seed} id {id}: {e}"));
                assert!(level.total_gems() > 0);
            }
        }
    }

    #[test]
    fn difficulty_curve_ramps_then_flattens() {
        assert_eq!(difficulty(1), 0.0);
        assert!(difficulty(5) > difficulty(2));
        assert_eq!(difficulty(11), 1.0);
        assert_eq!(difficulty(50), 1.0);
    }

    #[test]
    fn later_levels_are_longer() {
        let early = generate_level(7, 1);
        let late = generate_level(7, 12);
        assert!(late.width > early.width);
        assert!(late.gems.len() >= early.gems.len());
    }

    #[test]
    fn spawn_and_exit_sit_over_floor() {
        for id in 1..=12 {
            let level = generate_level(42, id);
            let over_floor = |x: f32, w: f32| {
                level.platforms.iter().any(|p| {
                    p.motion.is_none()
                        && p.position.y == FLOOR_Y
                        && p.position.x <= x
                        && p.position.x + p.size.x >= x + w
                })
            };
            assert!(over_floor(level.start.x, 32.0), "level {id} spawn");
            assert!(over_floor(level.exit.x, 48.0), "level {id} exit");
            assert!(level.exit.x + 48.0 <= level.width);
        }
    }

    #[test]
    fn checkpoints_sit_over_floor() {
        let level = generate_level(3, 12);
        assert!(!level.checkpoints.is_empty());
        for cp in &level.checkpoints {
            let supported = level.platforms.iter().any(|p| {
                p.position.y == FLOOR_Y
                    && p.position.x <= cp.position.x
                    && p.position.x + p.size.x >= cp.position.x + 32.0
            });
            assert!(supported, "checkpoint at {:?} has no floor", cp.position);
        }
    }

    #[test]
    fn provider_respects_count() {
        let mut levels = GeneratedLevels::new(5).with_count(4);
        assert!(levels.level(0).is_none());
        assert_eq!(levels.level(4).map(|l| l.id), Some(4));
        assert!(levels.level(5).is_none());
        assert_eq!(levels.level_count(), Some(4));

        let mut endless = GeneratedLevels::new(5);
        assert!(endless.level(500).is_some());
        assert_eq!(endless.level_count(), None);
    }
}
