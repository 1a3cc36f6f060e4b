//! Player collaborator: health and input-driven velocity
//!
//! Movement, rendering and collision of the player happen in the entity store
//! like every other object. This only owns what the store does not: remaining
//! health and the velocity integrated from the pressed directions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::normalize;
use crate::consts::*;

/// Pressed movement directions for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveInput {
    /// Raw direction (screen space, y down), not normalized
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        if self.up {
            dir.y -= 1.0;
        }
        if self.down {
            dir.y += 1.0;
        }
        dir
    }
}

/// Movement tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerMotion {
    pub acceleration: f32,
    pub max_speed: f32,
    pub friction: f32,
}

impl Default for PlayerMotion {
    fn default() -> Self {
        Self {
            acceleration: PLAYER_ACCELERATION,
            max_speed: PLAYER_MAX_SPEED,
            friction: PLAYER_FRICTION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub velocity: Vec2,
    pub radius: f32,
    pub max_health: i32,
    pub remaining_health: i32,
    pub motion: PlayerMotion,
    /// Seconds since the last mistimed shot (drives crosshair feedback)
    pub time_since_last_fail: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(PLAYER_RADIUS, PLAYER_MAX_HEALTH, PlayerMotion::default())
    }
}

impl Player {
    pub fn new(radius: f32, max_health: i32, motion: PlayerMotion) -> Self {
        Self {
            velocity: Vec2::ZERO,
            radius,
            max_health,
            remaining_health: max_health,
            motion,
            time_since_last_fail: f32::MAX,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.remaining_health > 0
    }

    /// Health never drops below zero
    pub fn take_damage(&mut self, amount: i32) {
        self.remaining_health = (self.remaining_health - amount).max(0);
    }

    /// Full health, standing still
    pub fn reset(&mut self) {
        self.remaining_health = self.max_health;
        self.velocity = Vec2::ZERO;
        self.time_since_last_fail = f32::MAX;
    }

    pub fn record_shot(&mut self, success: bool) {
        if !success {
            self.time_since_last_fail = 0.0;
        }
    }

    /// Integrate input for one frame and return the velocity for the player slot
    pub fn update(&mut self, input: &MoveInput, dt: f32) -> Vec2 {
        let direction = normalize(input.direction());
        self.velocity += direction * self.motion.acceleration * dt;
        self.velocity = self.velocity.clamp_length(0.0, self.motion.max_speed);
        self.velocity -= self.velocity * dt * self.motion.friction;

        if self.time_since_last_fail < f32::MAX {
            self.time_since_last_fail += dt;
        }
        self.velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_and_reset() {
        let mut player = Player::default();
        assert_eq!(player.remaining_health, PLAYER_MAX_HEALTH);

        player.take_damage(HEALTH_LINE_DAMAGE);
        assert_eq!(player.remaining_health, 10);
        assert!(player.is_alive());

        player.take_damage(100);
        assert_eq!(player.remaining_health, 0);
        assert!(!player.is_alive());

        player.reset();
        assert_eq!(player.remaining_health, PLAYER_MAX_HEALTH);
    }

    #[test]
    fn test_diagonal_input_is_normalized() {
        let mut straight = Player::default();
        let mut diagonal = Player::default();
        let dt = 0.01;

        let a = straight.update(&MoveInput { right: true, ..Default::default() }, dt);
        let b = diagonal.update(
            &MoveInput {
                right: true,
                down: true,
                ..Default::default()
            },
            dt,
        );
        assert!((a.length() - b.length()).abs() < 1e-4);
        // One step: 500 * 0.01 = 5, then 2% friction
        assert!((a.x - 4.9).abs() < 1e-4);
    }

    #[test]
    fn test_speed_is_capped() {
        let mut player = Player::default();
        let input = MoveInput { left: true, ..Default::default() };
        for _ in 0..10_000 {
            player.update(&input, SIM_DT);
        }
        assert!(player.velocity.length() <= PLAYER_MAX_SPEED);
        assert!(player.velocity.x < 0.0);
    }

    #[test]
    fn test_friction_brings_player_to_rest() {
        let mut player = Player::default();
        player.velocity = Vec2::new(300.0, 0.0);
        for _ in 0..5_000 {
            player.update(&MoveInput::default(), SIM_DT);
        }
        assert!(player.velocity.length() < 1e-3);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let input = MoveInput {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.direction(), Vec2::ZERO);
    }
}
