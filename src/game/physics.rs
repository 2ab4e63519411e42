//! Fixed-step physics primitives and world constants
//!
//! All constants are per-tick values for the 60 TPS simulation; nothing
//! here is scaled by a delta time.

use serde::{Deserialize, Serialize};

/// Downward acceleration added to vertical velocity every tick
pub const GRAVITY: f32 = 0.8;
/// Upward velocity impulse applied on jump entry
pub const JUMP_FORCE: f32 = -16.0;
/// Horizontal acceleration from held movement input
pub const MOVE_ACCEL: f32 = 1.5;
/// Per-tick velocity decay while the fighter has control
pub const FRICTION: f32 = 0.8;
/// Gentler decay applied while hurt (knockback bleeds off slowly)
pub const HURT_FRICTION: f32 = 0.9;

/// Y coordinate of the floor plane
pub const GROUND_Y: f32 = 400.0;
pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 500.0;

pub const FIGHTER_WIDTH: f32 = 50.0;
pub const FIGHTER_HEIGHT: f32 = 100.0;

/// Horizontal extent of the arena
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }
}

/// Axis-aligned box used for hitboxes and hurtboxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict-inequality overlap test: boxes that merely touch along an
    /// edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}
