use std::path::Path;

use serde::{Deserialize, Serialize};

use skyhop_core::geom::Vec2;

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV_VAR: &str = "SKYHOP_CONFIG";
/// Config file read when the environment variable is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/skyhop.toml";

/// Movement and body tuning for the physics integrator and collision resolver.
///
/// Units are level pixels and seconds; y grows downward, so gravity is
/// positive and jump velocity negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub gravity: f32,
    pub jump_velocity: f32,
    /// Upper bound on upward speed (applied as `-max_jump_speed`).
    pub max_jump_speed: f32,
    pub max_fall_speed: f32,
    pub move_speed: f32,
    pub player_width: f32,
    pub player_height: f32,
    pub gem_size: f32,
    pub checkpoint_width: f32,
    pub checkpoint_height: f32,
    pub portal_width: f32,
    pub portal_height: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 1800.0,
            jump_velocity: -720.0,
            max_jump_speed: 900.0,
            max_fall_speed: 1200.0,
            move_speed: 240.0,
            player_width: 32.0,
            player_height: 48.0,
            gem_size: 24.0,
            checkpoint_width: 32.0,
            checkpoint_height: 64.0,
            portal_width: 48.0,
            portal_height: 64.0,
        }
    }
}

impl PhysicsTuning {
    pub fn player_size(&self) -> Vec2 {
        Vec2::new(self.player_width, self.player_height)
    }

    pub fn gem_extent(&self) -> Vec2 {
        Vec2::new(self.gem_size, self.gem_size)
    }

    pub fn checkpoint_size(&self) -> Vec2 {
        Vec2::new(self.checkpoint_width, self.checkpoint_height)
    }

    pub fn portal_size(&self) -> Vec2 {
        Vec2::new(self.portal_width, self.portal_height)
    }
}

/// Game rules: lives, damage response, scoring and unlock gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTuning {
    pub default_lives: u32,
    pub invulnerability_secs: f32,
    /// Vertical velocity applied on a hazard hit (negative = upward).
    pub knockback_velocity: f32,
    /// How far below the level's bottom edge the player may fall before dying.
    pub fall_death_margin: f32,
    /// Points per second left on the clock at completion.
    pub bonus_rate: f32,
    /// Levels with an id at or below this are always playable.
    pub free_level_threshold: u32,
}

impl Default for RuleTuning {
    fn default() -> Self {
        Self {
            default_lives: 3,
            invulnerability_secs: 1.5,
            knockback_velocity: -420.0,
            fall_death_margin: 200.0,
            bonus_rate: 10.0,
            free_level_threshold: 3,
        }
    }
}

/// A tuning value the simulation cannot run with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be non-negative and finite, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be negative and finite, got {value}")]
    NotUpward { field: &'static str, value: f32 },
    #[error("default_lives must be at least 1")]
    NoLives,
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn upward(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value < 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotUpward { field, value })
    }
}

impl PhysicsTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("gravity", self.gravity)?;
        upward("jump_velocity", self.jump_velocity)?;
        positive("max_jump_speed", self.max_jump_speed)?;
        positive("max_fall_speed", self.max_fall_speed)?;
        positive("move_speed", self.move_speed)?;
        positive("player_width", self.player_width)?;
        positive("player_height", self.player_height)?;
        positive("gem_size", self.gem_size)?;
        positive("checkpoint_width", self.checkpoint_width)?;
        positive("checkpoint_height", self.checkpoint_height)?;
        positive("portal_width", self.portal_width)?;
        positive("portal_height", self.portal_height)
    }
}

impl RuleTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        non_negative("invulnerability_secs", self.invulnerability_secs)?;
        upward("knockback_velocity", self.knockback_velocity)?;
        non_negative("fall_death_margin", self.fall_death_margin)?;
        non_negative("bonus_rate", self.bonus_rate)
    }
}

/// Top-level simulation configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsTuning,
    pub rules: RuleTuning,
}

impl SimConfig {
    /// Load config from `$SKYHOP_CONFIG`, then `config/skyhop.toml`. Falls back
    /// to defaults if neither is readable or parseable.
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    /// Check every tuning value the tick depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        self.rules.validate()
    }

    /// Load config from a specific file, falling back to defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<SimConfig>(&content) {
                Ok(cfg) => match cfg.validate() {
                    Ok(()) => cfg,
                    Err(e) => {
                        tracing::warn!("Invalid tuning in {}: {e}, using defaults", path.display());
                        SimConfig::default()
                    },
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    SimConfig::default()
                },
            },
            Err(_) => {
                tracing::debug!("No config at {}, using defaults", path.display());
                SimConfig::default()
            },
        }
    }
}
