//! Per-frame movement, collision and destruction of objects
//!
//! The pass relies on the store being sorted by left edge: the sweep for
//! object `i` stops at the first object whose left edge lies past `i`'s right
//! edge. Pairs are resolved one at a time in array order, so the result is
//! deterministic for a given sort order and seed.

use serde::{Deserialize, Serialize};

use super::effects::Effects;
use super::entity::{EntityStore, Tag};
use super::geometry::circle_intersect;
use crate::consts::*;
use crate::{lerp, wrap_degrees};

/// Play field limits used by the destruction check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    /// Objects whose bottom edge passes this y coordinate hit the player
    pub health_line: f32,
    /// Objects may rise this far above the top edge before being culled
    pub top_margin: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            health_line: HEALTH_LINE_HEIGHT,
            top_margin: TOP_CULL_MARGIN,
        }
    }
}

/// Outcome of one destruction check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestructionReport {
    /// Objects that crossed the health line (each deals damage)
    pub health_line_impacts: u32,
    /// Objects silently culled for leaving the play field
    pub out_of_bounds: u32,
}

/// Sort, move, rotate and age everything for one frame
pub fn update_objects(
    store: &mut EntityStore,
    effects: &mut Effects,
    dt: f32,
    whole_note_length: f32,
) {
    store.sort();
    move_objects(store, dt);
    rotate_objects(store, dt);
    effects.update_lifetimes(dt, whole_note_length);
}

/// Integrate positions, resolve overlaps and apply the downward drift.
///
/// Dominance: an Unsplittable object imposes its velocity on whatever it
/// touches and is never pushed by a splittable one. Between two Unsplittable
/// objects the left one (earlier in sort order) wins. Otherwise the strictly
/// larger object wins and the other one is depenetrated away from it.
pub fn move_objects(store: &mut EntityStore, dt: f32) {
    let count = store.len();
    let player = store.player_index();

    for i in 0..count {
        let velocity = store.velocities[i];
        store.positions[i].center += velocity * dt;

        for other in (i + 1)..count {
            if store.positions[other].left() > store.positions[i].right() {
                break;
            }
            let contact = circle_intersect(&store.positions[i], &store.positions[other]);
            if !contact.hit {
                continue;
            }

            let i_wins = if store.tags[i] == Tag::Unsplittable {
                true
            } else if store.tags[other] == Tag::Unsplittable {
                false
            } else {
                store.positions[i].radius > store.positions[other].radius
            };

            if i_wins {
                store.velocities[other] = store.velocities[i];
                store.positions[other].center += contact.depenetration;
            } else {
                store.velocities[i] = store.velocities[other];
                store.positions[i].center -= contact.depenetration;
            }
        }

        // Player velocity is rewritten from input every frame
        if i == player {
            continue;
        }
        let vy = store.velocities[i].y;
        store.velocities[i].y += if store.tags[i] == Tag::Unsplittable {
            dt * lerp(200.0, 5.0, vy / 500.0)
        } else {
            dt * lerp(25.0, 5.0, vy / 50.0)
        };
    }
}

/// Spin every object with a non-zero angular force
pub fn rotate_objects(store: &mut EntityStore, dt: f32) {
    for rotation in store.rotations.iter_mut() {
        if rotation.force == 0.0 {
            continue;
        }
        rotation.angle = wrap_degrees(rotation.angle + rotation.force * dt);
    }
}

/// Remove objects that crossed the health line or left the play field.
///
/// Health line crossings leave a fading remnant and count as an impact; the
/// caller turns impacts into damage. Culled objects vanish without a trace.
/// The player slot is never touched.
pub fn check_destruction(store: &mut EntityStore, effects: &mut Effects, arena: &Arena) -> DestructionReport {
    let mut report = DestructionReport::default();
    let mut i = 0;

    while i < store.len() {
        if i == store.player_index() {
            i += 1;
            continue;
        }
        let circle = store.positions[i];

        if circle.bottom() > arena.health_line {
            effects.add_remnant(store.remnant(i, IMPACT_FADEOUT_SECS));
            store.remove(i);
            report.health_line_impacts += 1;
            continue;
        }

        let outside = circle.right() < 0.0
            || circle.left() > arena.width
            || circle.bottom() < -arena.top_margin
            || circle.top() > arena.height;
        if outside {
            store.remove(i);
            report.out_of_bounds += 1;
            continue;
        }

        i += 1;
    }

    report
}
