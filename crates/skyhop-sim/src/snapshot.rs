use serde::{Deserialize, Serialize};

use skyhop_core::geom::{Aabb, Vec2};

use crate::Phase;
use crate::entity::{MotionState, Player, World};

/// Player as drawn by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub bounds: Aabb,
    pub state: MotionState,
    /// Hosts typically blink the sprite while this is set.
    pub invulnerable: bool,
    pub facing_left: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemView {
    pub bounds: Aabb,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointView {
    pub bounds: Aabb,
    pub activated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalView {
    pub bounds: Aabb,
    pub active: bool,
}

/// Numbers shown over the play field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub level_id: u32,
    pub score: u32,
    pub gems_collected: u32,
    pub total_gems: u32,
    pub lives: u32,
    pub time_remaining: f32,
    pub phase: Phase,
}

/// Everything a render host needs to draw one frame. Only active gems are
/// listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub level_extent: Vec2,
    pub player: PlayerView,
    pub platforms: Vec<Aabb>,
    pub gems: Vec<GemView>,
    pub hazards: Vec<Aabb>,
    pub checkpoints: Vec<CheckpointView>,
    pub portal: PortalView,
    pub hud: Hud,
}

impl RenderSnapshot {
    pub(crate) fn capture(level_extent: Vec2, player: &Player, world: &World, hud: Hud) -> Self {
        Self {
            level_extent,
            player: PlayerView {
                bounds: player.bounds(),
                state: player.state,
                invulnerable: player.is_invulnerable(),
                facing_left: player.velocity.x < 0.0,
            },
            platforms: world.platforms.iter().map(|p| p.bounds()).collect(),
            gems: world
                .gems
                .iter()
                .filter(|g| !g.collected)
                .map(|g| GemView {
                    bounds: g.bounds(),
                    value: g.value,
                })
                .collect(),
            hazards: world.hazards.iter().map(|h| h.bounds()).collect(),
            checkpoints: world
                .checkpoints
                .iter()
                .map(|c| CheckpointView {
                    bounds: c.bounds(),
                    activated: c.activated,
                })
                .collect(),
            portal: PortalView {
                bounds: world.portal.bounds(),
                active: world.portal.active,
            },
            hud,
        }
    }
}

/// Serialize a snapshot to MessagePack for hosts on the other side of an
/// FFI or web bridge.
pub fn encode_snapshot(snapshot: &RenderSnapshot) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(snapshot)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<RenderSnapshot, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}
