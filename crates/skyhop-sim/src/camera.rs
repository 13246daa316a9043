use serde::{Deserialize, Serialize};

use skyhop_core::geom::Vec2;

/// Where the camera should center so the view never shows past the level
/// edges.
///
/// Per axis: `clamp(target, half, extent - half)`. When the level is
/// narrower (or shorter) than the viewport on an axis, the view centers on
/// the level instead.
pub fn camera_focus(target: Vec2, viewport_half: Vec2, level_extent: Vec2) -> Vec2 {
    Vec2::new(
        focus_axis(target.x, viewport_half.x, level_extent.x),
        focus_axis(target.y, viewport_half.y, level_extent.y),
    )
}

fn focus_axis(target: f32, half: f32, extent: f32) -> f32 {
    if extent <= 2.0 * half {
        return extent / 2.0;
    }
    let target = if target.is_finite() { target } else { extent / 2.0 };
    target.clamp(half, extent - half)
}

/// Smoothly follows a target, staying inside the level bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowCamera {
    pub center: Vec2,
    pub viewport_half: Vec2,
    /// Fraction of the remaining distance closed per second, scaled by dt.
    pub stiffness: f32,
}

impl FollowCamera {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            center: Vec2::ZERO,
            viewport_half: viewport * 0.5,
            stiffness: 5.0,
        }
    }

    /// Jump straight to the clamped focus, e.g. after a level load.
    pub fn snap(&mut self, target: Vec2, level_extent: Vec2) {
        self.center = camera_focus(target, self.viewport_half, level_extent);
    }

    /// Ease toward the clamped focus.
    pub fn update(&mut self, target: Vec2, level_extent: Vec2, dt: f32) {
        let goal = camera_focus(target, self.viewport_half, level_extent);
        let t = (self.stiffness * dt).clamp(0.0, 1.0);
        self.center = self.center + (goal - self.center) * t;
    }
}
