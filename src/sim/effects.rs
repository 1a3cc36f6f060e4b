//! Short-lived visual entities
//!
//! Laser trails, fading remnants of destroyed objects and background stars.
//! None of these collide or affect gameplay; they only carry enough state for
//! the renderer to animate them and expire on a timer.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entity::{Appearance, Color};
use super::geometry::Circle;
use crate::consts::*;

/// Elapsed/total lifetime pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    pub elapsed: f32,
    pub total: f32,
}

impl Lifetime {
    pub fn new(total: f32) -> Self {
        Self {
            elapsed: 0.0,
            total,
        }
    }

    /// Fraction of the lifetime used, 0-1
    pub fn progress(&self) -> f32 {
        if self.total <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.total).clamp(0.0, 1.0)
        }
    }
}

/// A laser shot drawn from the player edge to the aim point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    pub start: Vec2,
    pub end: Vec2,
    pub color: Color,
    pub lifetime: Lifetime,
}

impl Laser {
    pub const SUCCESS_COLOR: Color = Color::rgba(0, 200, 255, 255);
    pub const FAILURE_COLOR: Color = Color::rgba(255, 0, 0, 255);

    pub fn new(start: Vec2, end: Vec2, success: bool) -> Self {
        Self {
            start,
            end,
            color: if success {
                Self::SUCCESS_COLOR
            } else {
                Self::FAILURE_COLOR
            },
            lifetime: Lifetime::new(LASER_LIFETIME_SECS),
        }
    }
}

/// Snapshot of a destroyed object, kept around to fade it out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadingRemnant {
    pub position: Circle,
    pub appearance: Appearance,
    pub angle: f32,
    pub lifetime: Lifetime,
}

/// Decorative background star
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub pos: Vec2,
    pub max_size: f32,
    pub color: Color,
    /// Measured in whole notes, not seconds
    pub lifetime: Lifetime,
}

impl Star {
    pub const COLOR: Color = Color::rgba(200, 225, 255, 255);
}

/// All visual-only entity lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Effects {
    pub lasers: Vec<Laser>,
    pub remnants: Vec<FadingRemnant>,
    pub stars: Vec<Star>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_laser(&mut self, laser: Laser) {
        self.lasers.push(laser);
    }

    pub fn add_remnant(&mut self, remnant: FadingRemnant) {
        self.remnants.push(remnant);
    }

    pub fn add_star(&mut self, pos: Vec2, max_size: f32, color: Color, whole_notes: f32, elapsed: f32) {
        self.stars.push(Star {
            pos,
            max_size,
            color,
            lifetime: Lifetime {
                elapsed,
                total: whole_notes,
            },
        });
    }

    /// Scatter `count` stars over the play field with staggered ages
    pub fn spawn_starting_stars<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        width: f32,
        height: f32,
        rng: &mut R,
    ) {
        let max_x = (width as i32 - 100).max(1);
        let max_y = (height as i32 - 150).max(1);
        for _ in 0..count {
            let x = (rng.random_range(0..max_x) + 50) as f32;
            let y = (rng.random_range(0..max_y) + 50) as f32;
            let elapsed = rng.random_range(0..700) as f32 * 0.01;
            self.add_star(Vec2::new(x, y), 1.0, Star::COLOR, STAR_LIFETIME_WHOLE_NOTES, elapsed);
        }
    }

    /// Age every entry by `dt` and drop the expired ones.
    ///
    /// Stars live `total` whole notes, so their limit scales with the tempo.
    pub fn update_lifetimes(&mut self, dt: f32, whole_note_length: f32) {
        self.stars.retain_mut(|star| {
            star.lifetime.elapsed += dt;
            star.lifetime.elapsed <= whole_note_length * star.lifetime.total
        });
        self.lasers.retain_mut(|laser| {
            laser.lifetime.elapsed += dt;
            laser.lifetime.elapsed <= laser.lifetime.total
        });
        self.remnants.retain_mut(|remnant| {
            remnant.lifetime.elapsed += dt;
            remnant.lifetime.elapsed <= remnant.lifetime.total
        });
    }

    pub fn clear(&mut self) {
        self.lasers.clear();
        self.remnants.clear();
        self.stars.clear();
    }
}
