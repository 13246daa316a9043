use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use skyhop_core::geom::Vec2;

/// Error type for level loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("level {level}: extent must be positive and finite, got {width}x{height}")]
    InvalidExtent { level: u32, width: f32, height: f32 },
    #[error("level {level}: {what} has a non-finite coordinate")]
    NonFinite { level: u32, what: String },
    #[error("level {level}: {what} must have a positive size")]
    EmptyBox { level: u32, what: String },
    #[error("level {level}: time limit must be positive and finite, got {limit}")]
    InvalidTimeLimit { level: u32, limit: f32 },
    #[error("level {level}: {what} has an invalid motion speed")]
    InvalidMotion { level: u32, what: String },
    #[error("level {level}: gem {index} has no value")]
    ZeroGemValue { level: u32, index: usize },
    #[error("level {level}: hazard {index} deals no damage")]
    ZeroDamage { level: u32, index: usize },
    #[error("duplicate level id {0} in level pack")]
    DuplicateId(u32),
    #[error("failed to parse level data: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),
}

/// Ping-pong motion from an entity's start position to `end` and back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSpec {
    pub end: Vec2,
    /// Travel speed in units per second.
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub position: Vec2,
    pub size: Vec2,
    #[serde(default)]
    pub motion: Option<MotionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemSpec {
    pub position: Vec2,
    #[serde(default = "default_gem_value")]
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSpec {
    pub position: Vec2,
    pub size: Vec2,
    #[serde(default = "default_damage")]
    pub damage: u32,
    #[serde(default)]
    pub motion: Option<MotionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSpec {
    pub position: Vec2,
}

fn default_gem_value() -> u32 {
    10
}

fn default_damage() -> u32 {
    1
}

/// An immutable level descriptor, hand-authored or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Level index in progression order (1-based).
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Level extent in units.
    pub width: f32,
    pub height: f32,
    /// Player spawn (top-left of the player box).
    pub start: Vec2,
    /// Exit portal position (top-left).
    pub exit: Vec2,
    /// Seconds allowed to finish the level.
    pub time_limit: f32,
    #[serde(default)]
    pub platforms: Vec<PlatformSpec>,
    #[serde(default)]
    pub gems: Vec<GemSpec>,
    #[serde(default)]
    pub hazards: Vec<HazardSpec>,
    #[serde(default)]
    pub checkpoints: Vec<CheckpointSpec>,
}

impl LevelConfig {
    pub fn new(id: u32, width: f32, height: f32, start: Vec2, exit: Vec2, time_limit: f32) -> Self {
        Self {
            id,
            name: format!("Level {id}"),
            width,
            height,
            start,
            exit,
            time_limit,
            platforms: Vec::new(),
            gems: Vec::new(),
            hazards: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_platform(mut self, position: Vec2, size: Vec2) -> Self {
        self.platforms.push(PlatformSpec {
            position,
            size,
            motion: None,
        });
        self
    }

    pub fn with_moving_platform(mut self, position: Vec2, size: Vec2, end: Vec2, speed: f32) -> Self {
        self.platforms.push(PlatformSpec {
            position,
            size,
            motion: Some(MotionSpec { end, speed }),
        });
        self
    }

    pub fn with_gem(mut self, position: Vec2, value: u32) -> Self {
        self.gems.push(GemSpec { position, value });
        self
    }

    pub fn with_hazard(self, position: Vec2, size: Vec2) -> Self {
        self.with_hazard_damage(position, size, default_damage())
    }

    pub fn with_hazard_damage(mut self, position: Vec2, size: Vec2, damage: u32) -> Self {
        self.hazards.push(HazardSpec {
            position,
            size,
            damage,
            motion: None,
        });
        self
    }

    pub fn with_checkpoint(mut self, position: Vec2) -> Self {
        self.checkpoints.push(CheckpointSpec { position });
        self
    }

    /// Built-in level used when a requested level fails validation: a floor,
    /// one gem, and the exit at the far end.
    pub fn fallback() -> Self {
        LevelConfig::new(
            0,
            960.0,
            540.0,
            Vec2::new(64.0, 400.0),
            Vec2::new(860.0, 416.0),
            60.0,
        )
        .named("Fallback")
        .with_platform(Vec2::new(0.0, 480.0), Vec2::new(960.0, 60.0))
        .with_gem(Vec2::new(480.0, 440.0), 10)
    }

    /// Parse a single level from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, LevelError> {
        let level: LevelConfig = toml::from_str(content)?;
        level.validate()?;
        Ok(level)
    }

    /// Check the descriptor is something the simulation can run.
    pub fn validate(&self) -> Result<(), LevelError> {
        let level = self.id;
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(LevelError::InvalidExtent {
                level,
                width: self.width,
                height: self.height,
            });
        }
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            return Err(LevelError::InvalidTimeLimit {
                level,
                limit: self.time_limit,
            });
        }
        check_point(level, "start", self.start)?;
        check_point(level, "exit", self.exit)?;

        for (i, p) in self.platforms.iter().enumerate() {
            let what = format!("platform {i}");
            check_box(level, &what, p.position, p.size)?;
            check_motion(level, &what, p.motion.as_ref())?;
        }
        for (i, g) in self.gems.iter().enumerate() {
            check_point(level, &format!("gem {i}"), g.position)?;
            if g.value == 0 {
                return Err(LevelError::ZeroGemValue { level, index: i });
            }
        }
        for (i, h) in self.hazards.iter().enumerate() {
            let what = format!("hazard {i}");
            check_box(level, &what, h.position, h.size)?;
            check_motion(level, &what, h.motion.as_ref())?;
            if h.damage == 0 {
                return Err(LevelError::ZeroDamage { level, index: i });
            }
        }
        for (i, c) in self.checkpoints.iter().enumerate() {
            check_point(level, &format!("checkpoint {i}"), c.position)?;
        }
        Ok(())
    }

    pub fn total_gems(&self) -> u32 {
        self.gems.len() as u32
    }
}

fn check_point(level: u32, what: &str, p: Vec2) -> Result<(), LevelError> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(LevelError::NonFinite {
            level,
            what: what.to_string(),
        })
    }
}

fn check_box(level: u32, what: &str, position: Vec2, size: Vec2) -> Result<(), LevelError> {
    check_point(level, what, position)?;
    check_point(level, what, size)?;
    if size.x <= 0.0 || size.y <= 0.0 {
        return Err(LevelError::EmptyBox {
            level,
            what: what.to_string(),
        });
    }
    Ok(())
}

fn check_motion(level: u32, what: &str, motion: Option<&MotionSpec>) -> Result<(), LevelError> {
    let Some(motion) = motion else {
        return Ok(());
    };
    check_point(level, what, motion.end)?;
    if !motion.speed.is_finite() || motion.speed < 0.0 {
        return Err(LevelError::InvalidMotion {
            level,
            what: what.to_string(),
        });
    }
    Ok(())
}

/// Source of level descriptors. The simulation does not care whether levels
/// are hand-authored or generated.
pub trait LevelProvider: Send {
    /// The level with the given id, if one exists.
    fn level(&mut self, id: u32) -> Option<LevelConfig>;

    /// Number of levels, when the provider is finite.
    fn level_count(&self) -> Option<u32> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct LevelPackFile {
    #[serde(default)]
    levels: Vec<LevelConfig>,
}

/// A fixed set of hand-authored levels keyed by id.
#[derive(Debug, Clone, Default)]
pub struct LevelPack {
    levels: BTreeMap<u32, LevelConfig>,
}

impl LevelPack {
    /// Build a pack, rejecting duplicate ids and invalid levels.
    pub fn new(levels: Vec<LevelConfig>) -> Result<Self, LevelError> {
        let mut map = BTreeMap::new();
        for level in levels {
            level.validate()?;
            let id = level.id;
            if map.insert(id, level).is_some() {
                return Err(LevelError::DuplicateId(id));
            }
        }
        Ok(Self { levels: map })
    }

    /// Parse a pack from TOML with one `[[levels]]` table per level.
    pub fn from_toml_str(content: &str) -> Result<Self, LevelError> {
        let file: LevelPackFile = toml::from_str(content)?;
        Self::new(file.levels)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn first_id(&self) -> Option<u32> {
        self.levels.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl LevelProvider for LevelPack {
    fn level(&mut self, id: u32) -> Option<LevelConfig> {
        self.levels.get(&id).cloned()
    }

    fn level_count(&self) -> Option<u32> {
        Some(self.levels.len() as u32)
    }
}
