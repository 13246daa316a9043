use serde::{Deserialize, Serialize};

use skyhop_core::geom::{Aabb, Vec2};
use skyhop_core::timer::Countdown;

use crate::config::PhysicsTuning;
use crate::level::{LevelConfig, MotionSpec};

/// Animation-facing motion state of the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Idle,
    Running,
    Jumping,
    Falling,
    Hurt,
}

/// The player body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub on_ground: bool,
    /// Platform the player stood on at the end of the last tick.
    pub riding: Option<usize>,
    pub invulnerability: Countdown,
    pub state: MotionState,
}

impl Player {
    pub fn new(spawn: Vec2, size: Vec2) -> Self {
        Self {
            position: spawn,
            velocity: Vec2::ZERO,
            size,
            on_ground: false,
            riding: None,
            invulnerability: Countdown::default(),
            state: MotionState::Idle,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.is_active()
    }

    /// Place the player at `at` with no momentum.
    pub fn respawn(&mut self, at: Vec2) {
        self.position = at;
        self.velocity = Vec2::ZERO;
        self.on_ground = false;
        self.riding = None;
        self.state = MotionState::Idle;
    }
}

/// Ping-pong motion between a start and end point at constant speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub start: Vec2,
    pub end: Vec2,
    pub speed: f32,
    pub forward: bool,
    /// Distance travelled from `start` along the path.
    progress: f32,
}

impl Motion {
    pub fn new(start: Vec2, spec: &MotionSpec) -> Self {
        Self {
            start,
            end: spec.end,
            speed: spec.speed,
            forward: true,
            progress: 0.0,
        }
    }

    pub fn length(&self) -> f32 {
        (self.end - self.start).length()
    }

    pub fn position(&self) -> Vec2 {
        let len = self.length();
        if len <= 0.0 {
            return self.start;
        }
        self.start + (self.end - self.start) * (self.progress / len)
    }

    /// Advance along the path by `speed * dt`, reflecting at either end.
    /// Returns the new position.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        let len = self.length();
        if len <= 0.0 || self.speed <= 0.0 || dt <= 0.0 {
            return self.position();
        }
        // A full round trip is 2 * len, so only the remainder matters
        let mut remaining = (self.speed * dt) % (2.0 * len);
        while remaining > 0.0 {
            let room = if self.forward {
                len - self.progress
            } else {
                self.progress
            };
            if remaining <= room {
                self.progress += if self.forward { remaining } else { -remaining };
                remaining = 0.0;
            } else {
                self.progress = if self.forward { len } else { 0.0 };
                remaining -= room;
                self.forward = !self.forward;
            }
        }
        self.position()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub position: Vec2,
    pub size: Vec2,
    pub motion: Option<Motion>,
}

impl Platform {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    /// Move along the platform's path. Returns the displacement this tick.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        match self.motion.as_mut() {
            Some(motion) => {
                let next = motion.advance(dt);
                let delta = next - self.position;
                self.position = next;
                delta
            },
            None => Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gem {
    /// Index of the gem in the level definition.
    pub id: usize,
    pub position: Vec2,
    pub size: Vec2,
    pub value: u32,
    pub collected: bool,
}

impl Gem {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub position: Vec2,
    pub size: Vec2,
    pub damage: u32,
    pub motion: Option<Motion>,
}

impl Hazard {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(motion) = self.motion.as_mut() {
            self.position = motion.advance(dt);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Rank by horizontal position; activation may only move to a higher order.
    pub order: usize,
    pub position: Vec2,
    pub size: Vec2,
    pub activated: bool,
}

impl Checkpoint {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPortal {
    pub position: Vec2,
    pub size: Vec2,
    /// True once every gem is collected.
    pub active: bool,
}

impl ExitPortal {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }
}

/// Every live entity of the current level, one typed collection per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub platforms: Vec<Platform>,
    /// Uncollected gems only; collected gems are removed.
    pub gems: Vec<Gem>,
    pub hazards: Vec<Hazard>,
    /// Sorted by `order`.
    pub checkpoints: Vec<Checkpoint>,
    pub portal: ExitPortal,
    /// Definition indices of gems collected this attempt.
    pub collected: Vec<usize>,
}

impl World {
    pub fn empty() -> Self {
        Self {
            platforms: Vec::new(),
            gems: Vec::new(),
            hazards: Vec::new(),
            checkpoints: Vec::new(),
            portal: ExitPortal {
                position: Vec2::ZERO,
                size: Vec2::ZERO,
                active: false,
            },
            collected: Vec::new(),
        }
    }

    /// Instantiate entities from a level. Gems whose definition index is in
    /// `already_collected` are left out.
    pub fn from_level(level: &LevelConfig, physics: &PhysicsTuning, already_collected: &[usize]) -> Self {
        let platforms = level
            .platforms
            .iter()
            .map(|p| Platform {
                position: p.position,
                size: p.size,
                motion: p.motion.as_ref().map(|m| Motion::new(p.position, m)),
            })
            .collect();

        let gems = level
            .gems
            .iter()
            .enumerate()
            .filter(|(id, _)| !already_collected.contains(id))
            .map(|(id, g)| Gem {
                id,
                position: g.position,
                size: physics.gem_extent(),
                value: g.value,
                collected: false,
            })
            .collect();

        let hazards = level
            .hazards
            .iter()
            .map(|h| Hazard {
                position: h.position,
                size: h.size,
                damage: h.damage,
                motion: h.motion.as_ref().map(|m| Motion::new(h.position, m)),
            })
            .collect();

        let mut ordered: Vec<Vec2> = level.checkpoints.iter().map(|c| c.position).collect();
        ordered.sort_by(|a, b| a.x.total_cmp(&b.x));
        let checkpoints = ordered
            .into_iter()
            .enumerate()
            .map(|(order, position)| Checkpoint {
                order,
                position,
                size: physics.checkpoint_size(),
                activated: false,
            })
            .collect();

        let mut collected = already_collected.to_vec();
        collected.sort_unstable();
        collected.dedup();

        let mut world = Self {
            platforms,
            gems,
            hazards,
            checkpoints,
            portal: ExitPortal {
                position: level.exit,
                size: physics.portal_size(),
                active: false,
            },
            collected,
        };
        world.portal.active = world.gems.is_empty();
        world
    }

    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Move every moving platform and hazard. Returns each platform's
    /// displacement, indexed like `platforms`.
    pub fn advance_movers(&mut self, dt: f32) -> Vec<Vec2> {
        for hazard in &mut self.hazards {
            hazard.advance(dt);
        }
        self.platforms.iter_mut().map(|p| p.advance(dt)).collect()
    }
}
