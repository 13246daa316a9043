use crate::config::PhysicsTuning;
use crate::entity::{MotionState, Player};

/// Start a jump. Accepted only while grounded and alive; otherwise a no-op.
pub fn try_jump(player: &mut Player, lives: u32, physics: &PhysicsTuning) -> bool {
    if !player.on_ground || lives == 0 {
        return false;
    }
    player.velocity.y = physics.jump_velocity;
    player.on_ground = false;
    player.riding = None;
    true
}

/// Apply gravity to an airborne player and clamp vertical speed.
pub fn apply_gravity(player: &mut Player, physics: &PhysicsTuning, dt: f32) {
    if player.on_ground {
        return;
    }
    player.velocity.y = (player.velocity.y + physics.gravity * dt)
        .clamp(-physics.max_jump_speed, physics.max_fall_speed);
}

/// Advance the player by one tick of explicit Euler integration.
///
/// Grounding is cleared first; only the collision resolver can re-assert it,
/// so walking off a ledge starts a fall on the same tick.
pub fn integrate(player: &mut Player, move_dir: f32, physics: &PhysicsTuning, dt: f32) {
    // Horizontal movement (sanitize NaN/Inf)
    let move_dir = if move_dir.is_finite() {
        move_dir.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    player.velocity.x = move_dir * physics.move_speed;

    player.on_ground = false;
    player.riding = None;
    apply_gravity(player, physics, dt);

    player.position += player.velocity * dt;

    player.invulnerability.tick(dt);
}

/// Derive the animation state from velocity and flags.
///
/// Airborne direction follows the sign of vertical velocity: negative is a
/// jump, zero or positive is a fall.
pub fn update_motion_state(player: &mut Player) {
    player.state = if player.is_invulnerable() {
        MotionState::Hurt
    } else if player.on_ground {
        if player.velocity.x != 0.0 {
            MotionState::Running
        } else {
            MotionState::Idle
        }
    } else if player.velocity.y < 0.0 {
        MotionState::Jumping
    } else {
        MotionState::Falling
    };
}
