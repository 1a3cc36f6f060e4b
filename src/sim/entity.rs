//! Structure-of-arrays store for every movable object
//!
//! All per-object attributes live in parallel vectors indexed by a shared
//! slot index. The store owns every index-shifting mutation (insert, remove,
//! swap) so the tracked player index can never go stale.
//!
//! Invariants:
//! - exactly one slot is tagged [`Tag::Player`] and `player_index` points at it
//! - the player slot can never be removed
//! - `len() <= capacity()`

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effects::{FadingRemnant, Lifetime};
use super::geometry::{Circle, perpendicular_cw, rotate_degrees};
use crate::consts::*;
use crate::wrap_degrees;

/// Role of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tag {
    #[default]
    Asteroid,
    /// Locked out after a mistimed hit: cannot split, dominates collisions
    Unsplittable,
    Player,
    None,
}

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Tint applied to objects locked out by a mistimed hit
    pub const LOCKED_OUT: Color = Color::rgba(150, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Slight per-object variation around a pale blue
    pub fn random_asteroid<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            r: rng.random_range(200..225),
            g: rng.random_range(220..240),
            b: rng.random_range(240..255),
            a: 255,
        }
    }

    /// A non-zero blue channel marks an object that can still be split
    #[inline]
    pub fn is_splittable(&self) -> bool {
        self.b > 0
    }

    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Handle into the renderer's texture table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureId(pub u16);

/// How an object is drawn. The tint is gameplay-relevant (see [`Color::is_splittable`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub texture: TextureId,
    pub tint: Color,
}

impl Appearance {
    /// Random asteroid texture out of `texture_count` with a random splittable tint
    pub fn random_asteroid<R: Rng + ?Sized>(rng: &mut R, texture_count: u16) -> Self {
        let texture = if texture_count == 0 {
            TextureId(0)
        } else {
            TextureId(rng.random_range(0..texture_count))
        };
        Self {
            texture,
            tint: Color::random_asteroid(rng),
        }
    }
}

/// Spin: angular velocity (degrees/s) and current angle (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub force: f32,
    pub angle: f32,
}

impl Rotation {
    pub const fn new(force: f32, angle: f32) -> Self {
        Self { force, angle }
    }
}

/// What a split did to the object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitOutcome {
    /// The object shrank and `fragments` extra objects were created
    Split { fragments: usize },
    /// The object became too small and was removed
    Destroyed(FadingRemnant),
    /// Invalid index or the player slot
    Ignored,
}

/// Parallel attribute arrays for all live objects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore {
    pub(super) positions: Vec<Circle>,
    pub(super) velocities: Vec<Vec2>,
    pub(super) rotations: Vec<Rotation>,
    pub(super) scale_offsets: Vec<f32>,
    pub(super) appearances: Vec<Appearance>,
    pub(super) tags: Vec<Tag>,
    player_index: usize,
    capacity: usize,
}

impl EntityStore {
    /// Create a store holding only the player
    pub fn new(capacity: usize, player: Circle, player_appearance: Appearance) -> Self {
        let capacity = capacity.max(1);
        let mut store = Self {
            positions: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
            rotations: Vec::with_capacity(capacity),
            scale_offsets: Vec::with_capacity(capacity),
            appearances: Vec::with_capacity(capacity),
            tags: Vec::with_capacity(capacity),
            player_index: 0,
            capacity,
        };
        store.push(
            player,
            Rotation::default(),
            Vec2::ZERO,
            0.0,
            player_appearance,
            Tag::Player,
        );
        store
    }

    /// Number of live objects, player included
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Never true while the player exists; here for API completeness
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn player_index(&self) -> usize {
        self.player_index
    }

    pub fn player_position(&self) -> Circle {
        self.positions[self.player_index]
    }

    pub fn set_player_velocity(&mut self, velocity: Vec2) {
        self.velocities[self.player_index] = velocity;
    }

    pub fn set_player_tint(&mut self, tint: Color) {
        self.appearances[self.player_index].tint = tint;
    }

    /// Move the player slot without touching any other attribute
    pub fn place_player(&mut self, center: Vec2) {
        self.positions[self.player_index].center = center;
        self.velocities[self.player_index] = Vec2::ZERO;
    }

    pub fn positions(&self) -> &[Circle] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.velocities
    }

    pub fn rotations(&self) -> &[Rotation] {
        &self.rotations
    }

    pub fn scale_offsets(&self) -> &[f32] {
        &self.scale_offsets
    }

    pub fn appearances(&self) -> &[Appearance] {
        &self.appearances
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Whether a hit on this slot can still split it
    pub fn is_splittable(&self, index: usize) -> bool {
        index < self.len() && self.appearances[index].tint.is_splittable()
    }

    /// Append an object. Returns its slot, or `None` when the store is full
    /// or a second player is requested.
    pub fn create(
        &mut self,
        position: Circle,
        rotation: Rotation,
        velocity: Vec2,
        scale_offset: f32,
        appearance: Appearance,
        tag: Tag,
    ) -> Option<usize> {
        if tag == Tag::Player {
            return None;
        }
        if self.len() >= self.capacity {
            log::warn!("Entity store full ({}), spawn dropped", self.capacity);
            return None;
        }
        Some(self.push(position, rotation, velocity, scale_offset, appearance, tag))
    }

    fn push(
        &mut self,
        position: Circle,
        rotation: Rotation,
        velocity: Vec2,
        scale_offset: f32,
        appearance: Appearance,
        tag: Tag,
    ) -> usize {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.rotations.push(rotation);
        self.scale_offsets.push(scale_offset);
        self.appearances.push(appearance);
        self.tags.push(tag);
        self.len() - 1
    }

    /// Erase a slot. Out-of-range indices and the player slot are ignored.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.len() || index == self.player_index {
            return false;
        }
        self.positions.remove(index);
        self.velocities.remove(index);
        self.rotations.remove(index);
        self.scale_offsets.remove(index);
        self.appearances.remove(index);
        self.tags.remove(index);

        if index < self.player_index {
            self.player_index -= 1;
        }
        true
    }

    /// Remove everything except the player
    pub fn clear(&mut self) {
        for i in (0..self.len()).rev() {
            self.remove(i);
        }
    }

    /// Exchange two slots across every array
    fn swap(&mut self, a: usize, b: usize) {
        self.positions.swap(a, b);
        self.velocities.swap(a, b);
        self.rotations.swap(a, b);
        self.scale_offsets.swap(a, b);
        self.appearances.swap(a, b);
        self.tags.swap(a, b);

        if self.player_index == a {
            self.player_index = b;
        } else if self.player_index == b {
            self.player_index = a;
        }
    }

    /// Insertion sort by left edge (`x - radius`), the sweep precondition.
    ///
    /// Objects barely move between frames, so the array is nearly sorted and
    /// this stays close to linear.
    pub fn sort(&mut self) {
        for i in 1..self.len() {
            let mut j = i;
            while j > 0 && self.positions[j].left() < self.positions[j - 1].left() {
                self.swap(j, j - 1);
                j -= 1;
            }
        }
    }

    /// True when the sweep precondition holds
    pub fn is_sorted(&self) -> bool {
        self.positions.windows(2).all(|w| w[0].left() <= w[1].left())
    }

    /// Lock a slot out after a mistimed hit: it can never be split again
    pub fn lock_out(&mut self, index: usize) {
        if index >= self.len() || index == self.player_index {
            return;
        }
        self.appearances[index].tint = Color::LOCKED_OUT;
        self.tags[index] = Tag::Unsplittable;
    }

    /// Snapshot a slot for its fade-out animation
    pub fn remnant(&self, index: usize, fade_secs: f32) -> FadingRemnant {
        FadingRemnant {
            position: self.positions[index],
            appearance: self.appearances[index],
            angle: self.rotations[index].angle,
            lifetime: Lifetime::new(fade_secs),
        }
    }

    /// Break an object apart along `direction` (the hit axis).
    ///
    /// Large objects fan out into 7 pieces, medium into 3 and small ones just
    /// halve. The object's own slot is reused for the first piece. If the new
    /// radius would fall under [`MIN_RADIUS`] the object is removed instead and
    /// its remnant returned.
    pub fn split<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        direction: Vec2,
        rng: &mut R,
    ) -> SplitOutcome {
        if index >= self.len() || index == self.player_index {
            return SplitOutcome::Ignored;
        }

        let previous_radius = self.positions[index].radius;
        let (scale, splits) = if previous_radius > WHOLE_NOTE_RADIUS_THRESHOLD {
            (LARGE_SPLIT_SCALE, LARGE_SPLIT_COUNT)
        } else if previous_radius > TRIPLE_SPLIT_RADIUS_THRESHOLD {
            (MEDIUM_SPLIT_SCALE, MEDIUM_SPLIT_COUNT)
        } else {
            (SMALL_SPLIT_SCALE, 1)
        };
        self.positions[index].radius *= scale;

        if self.positions[index].radius < MIN_RADIUS {
            let remnant = self.remnant(index, SPLIT_FADEOUT_SECS);
            self.remove(index);
            return SplitOutcome::Destroyed(remnant);
        }

        let mut fan = perpendicular_cw(direction);
        self.velocities[index] = fan * split_force(rng);
        self.positions[index].center += fan * previous_radius;
        self.rotations[index].angle = random_angle(rng);

        let step = 360.0 / (splits + 1) as f32;
        let mut fragments = 0;
        for _ in 0..splits {
            fan = rotate_degrees(fan, step);
            let force = split_force(rng);

            let appearance = Appearance {
                texture: self.appearances[index].texture,
                tint: Color::random_asteroid(rng),
            };
            let Some(slot) = self.create(
                self.positions[index],
                self.rotations[index],
                self.velocities[index],
                0.0,
                appearance,
                Tag::Asteroid,
            ) else {
                break;
            };
            self.velocities[slot] = fan * force;
            self.positions[slot].center += fan * previous_radius;
            self.rotations[slot].angle = random_angle(rng);
            fragments += 1;
        }

        SplitOutcome::Split { fragments }
    }
}

fn split_force<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    (rng.random_range(0..SPLIT_FORCE_SPREAD) + SPLIT_FORCE_MIN) as f32 * SPLIT_FORCE_SCALE
}

fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    wrap_degrees(rng.random_range(0..360) as f32)
}
