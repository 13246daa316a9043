use serde::{Deserialize, Serialize};

use skyhop_core::geom::Vec2;

use crate::entity::{Player, World};

/// Tolerance when comparing the player's previous feet to a platform top.
const LANDING_EPSILON: f32 = 1e-3;

/// A non-physical collision outcome, applied by the level session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Contact {
    /// A gem was picked up and already removed from the world.
    GemCollected { id: usize, value: u32 },
    HazardHit { index: usize, damage: u32 },
    CheckpointReached { order: usize },
    PortalReached,
}

/// Resolve the player against every entity kind for this tick.
///
/// `previous` is the player's position before integration. Platforms are
/// handled first so later overlap tests use the corrected position. Within a
/// kind, entities are visited in definition order.
pub fn resolve(player: &mut Player, previous: Vec2, world: &mut World) -> Vec<Contact> {
    land_on_platforms(player, previous, world);

    let mut contacts = Vec::new();
    collect_gems(player, world, &mut contacts);

    let bounds = player.bounds();
    for (index, hazard) in world.hazards.iter().enumerate() {
        if bounds.overlaps(&hazard.bounds()) {
            contacts.push(Contact::HazardHit {
                index,
                damage: hazard.damage,
            });
        }
    }

    for checkpoint in &world.checkpoints {
        if bounds.overlaps(&checkpoint.bounds()) {
            contacts.push(Contact::CheckpointReached {
                order: checkpoint.order,
            });
        }
    }

    if bounds.overlaps(&world.portal.bounds()) {
        contacts.push(Contact::PortalReached);
    }

    contacts
}

/// Platforms are one-way: the player lands only when moving down (or not at
/// all) and its feet started the tick at or above the platform top. Rising
/// through a platform from below never lands.
pub(crate) fn land_on_platforms(player: &mut Player, previous: Vec2, world: &World) {
    let previous_feet = previous.y + player.size.y;

    for (index, platform) in world.platforms.iter().enumerate() {
        if !player.bounds().overlaps(&platform.bounds()) {
            continue;
        }
        if player.velocity.y < 0.0 || previous_feet > platform.top() + LANDING_EPSILON {
            continue;
        }
        player.position.y = platform.top() - player.size.y;
        player.velocity.y = 0.0;
        player.on_ground = true;
        player.riding = Some(index);
    }
}

fn collect_gems(player: &Player, world: &mut World, contacts: &mut Vec<Contact>) {
    let bounds = player.bounds();
    let collected = &mut world.collected;
    world.gems.retain_mut(|gem| {
        if !bounds.overlaps(&gem.bounds()) {
            return true;
        }
        gem.collected = true;
        collected.push(gem.id);
        contacts.push(Contact::GemCollected {
            id: gem.id,
            value: gem.value,
        });
        false
    });
}
