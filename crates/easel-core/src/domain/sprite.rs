//! Sprite simulation: linear motion with edge reflection.

use crate::domain::surface::{ROOT_HEIGHT, ROOT_WIDTH};

/// Side length of the sprite's square bounding box, in pixels.
pub const SPRITE_SIZE: i32 = 128;

/// Initial velocity along each axis, in pixels per second.
pub const INITIAL_VELOCITY: i32 = 200;

/// Largest legal x for the sprite's upper-left corner.
const MAX_X: i32 = ROOT_WIDTH - SPRITE_SIZE;

/// Largest legal y for the sprite's upper-left corner.
const MAX_Y: i32 = ROOT_HEIGHT - SPRITE_SIZE;

/// Position and velocity of the bouncing sprite.
///
/// `x`/`y` locate the upper-left corner of the bounding box; after every
/// [`advance`](SpriteState::advance) they satisfy `0 <= x <= 896` and
/// `0 <= y <= 640`, enforced by mirror reflection at the field edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteState {
    pub x: i32,
    pub y: i32,
    /// Pixels per second; sign gives the direction of travel.
    pub velocity_x: i32,
    pub velocity_y: i32,
}

impl SpriteState {
    /// A sprite at the upper-left corner, moving toward the lower-right.
    pub fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            velocity_x: INITIAL_VELOCITY,
            velocity_y: INITIAL_VELOCITY,
        }
    }

    /// Advances the sprite by `delta_t_ms` milliseconds of travel, then
    /// reflects it off any edge it crossed.  Deterministic: identical inputs
    /// always yield identical states.
    ///
    /// The mirror formula (`x'' = 2*max - x'`) assumes the per-tick overshoot
    /// is smaller than the travel range.  A stall long enough to violate that
    /// (several seconds at the default velocity) produces a displaced but
    /// in-principle-defined position rather than a crash; this matches the
    /// original behavior and is deliberately left as is.
    pub fn advance(&mut self, delta_t_ms: i64) {
        self.x += (self.velocity_x as i64 * delta_t_ms / 1000) as i32;
        self.y += (self.velocity_y as i64 * delta_t_ms / 1000) as i32;

        if self.x < 0 {
            self.x = -self.x;
            self.velocity_x = -self.velocity_x;
        } else if self.x >= MAX_X {
            self.x = 2 * MAX_X - self.x;
            self.velocity_x = -self.velocity_x;
        }

        if self.y < 0 {
            self.y = -self.y;
            self.velocity_y = -self.velocity_y;
        } else if self.y >= MAX_Y {
            self.y = 2 * MAX_Y - self.y;
            self.velocity_y = -self.velocity_y;
        }
    }
}

impl Default for SpriteState {
    fn default() -> Self {
        Self::new()
    }
}
