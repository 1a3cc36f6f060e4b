//! Laser shot resolution
//!
//! A shot hits the first object (in store order) whose circle contains the aim
//! point. Whether the hit counts depends on the object's size tier and the
//! matching beat window; a mistimed hit locks the object out for good.

use glam::Vec2;
use rand::Rng;

use super::beat::{BeatSnapshot, NoteValue};
use super::effects::{Effects, Laser};
use super::entity::{EntityStore, SplitOutcome};
use super::geometry::{Circle, point_in_circle, unit_direction};

/// What a single shot did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotOutcome {
    /// On-beat shot (the only value audio/visual feedback needs)
    pub success: bool,
    /// Whether the aim point was inside an object
    pub hit_object: bool,
}

/// Shot origin on the player's edge, facing the aim point
pub fn laser_origin(player: &Circle, target: Vec2) -> Vec2 {
    player.center + unit_direction(player.center, target) * player.radius
}

/// Resolve a shot from `origin` aimed at `target`.
///
/// A laser trail is always recorded. When nothing is under the aim point the
/// shot succeeds iff the quarter-note window is open.
pub fn fire_laser<R: Rng + ?Sized>(
    store: &mut EntityStore,
    effects: &mut Effects,
    beat: &BeatSnapshot,
    origin: Vec2,
    target: Vec2,
    rng: &mut R,
) -> ShotOutcome {
    let player = store.player_index();
    let candidate = (0..store.len())
        .filter(|&i| i != player)
        .find(|&i| point_in_circle(target, &store.positions()[i]));

    let Some(index) = candidate else {
        let success = beat.quarter_note_active;
        effects.add_laser(Laser::new(origin, target, success));
        return ShotOutcome {
            success,
            hit_object: false,
        };
    };

    let splittable = store.is_splittable(index);
    let note = NoteValue::for_radius(store.positions()[index].radius);
    let success = splittable && beat.is_active(note);

    if success {
        store.positions[index].center = target;
        let direction = unit_direction(origin, target);
        if let SplitOutcome::Destroyed(remnant) = store.split(index, direction, rng) {
            effects.add_remnant(remnant);
        }
    } else if splittable {
        store.lock_out(index);
    }

    effects.add_laser(Laser::new(origin, target, success));
    ShotOutcome {
        success,
        hit_object: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::beat::Beat;
    use crate::sim::entity::tests::{add_rock, test_store};
    use crate::sim::entity::{Color, Tag};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn beat_with(whole: bool, half: bool, quarter: bool) -> BeatSnapshot {
        let mut snapshot = BeatSnapshot::for_beat(&Beat::new("test", 120, 4));
        snapshot.whole_note_active = whole;
        snapshot.half_note_active = half;
        snapshot.quarter_note_active = quarter;
        snapshot
    }

    #[test]
    fn test_laser_origin_on_player_edge() {
        let player = Circle::new(100.0, 100.0, PLAYER_RADIUS);
        let origin = laser_origin(&player, Vec2::new(100.0, 0.0));
        assert!((origin - Vec2::new(100.0, 55.0)).length() < 1e-4);

        // Aiming at the centre leaves the origin there
        assert_eq!(laser_origin(&player, player.center), player.center);
    }

    #[test]
    fn test_free_shot_follows_quarter_window() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut store = test_store();
        let mut effects = Effects::new();

        let on_beat = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(false, false, true),
            Vec2::ZERO,
            Vec2::new(50.0, 50.0),
            &mut rng,
        );
        assert!(on_beat.success);
        assert!(!on_beat.hit_object);

        let off_beat = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(true, true, false),
            Vec2::ZERO,
            Vec2::new(50.0, 50.0),
            &mut rng,
        );
        assert!(!off_beat.success);

        assert_eq!(effects.lasers.len(), 2);
        assert_eq!(effects.lasers[0].color, Laser::SUCCESS_COLOR);
        assert_eq!(effects.lasers[1].color, Laser::FAILURE_COLOR);
    }

    #[test]
    fn test_shot_never_targets_player() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut store = test_store();
        let mut effects = Effects::new();
        let player = store.player_position();

        let outcome = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(false, false, false),
            Vec2::ZERO,
            player.center,
            &mut rng,
        );
        assert!(!outcome.hit_object);
        assert_eq!(store.appearances()[store.player_index()].tint, Color::WHITE);
    }

    #[test]
    fn test_large_object_needs_whole_note() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut store = test_store();
        let mut effects = Effects::new();
        let index = add_rock(&mut store, 500.0, 300.0, 60.0);
        let target = Vec2::new(510.0, 300.0);

        let outcome = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(true, false, false),
            Vec2::new(500.0, 800.0),
            target,
            &mut rng,
        );
        assert!(outcome.success);
        assert!(outcome.hit_object);
        // Player + 7 fragments
        assert_eq!(store.len(), 8);
        assert!((store.positions()[index].radius - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_mistimed_hit_locks_out_for_good() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut store = test_store();
        let mut effects = Effects::new();
        let index = add_rock(&mut store, 500.0, 300.0, 60.0);
        let target = Vec2::new(500.0, 300.0);

        // Half and quarter windows open but not the whole-note one
        let miss = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(false, true, true),
            Vec2::new(500.0, 800.0),
            target,
            &mut rng,
        );
        assert!(!miss.success);
        assert_eq!(store.tags()[index], Tag::Unsplittable);
        assert_eq!(store.appearances()[index].tint, Color::LOCKED_OUT);
        assert_eq!(store.len(), 2);

        let retry = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(true, true, true),
            Vec2::new(500.0, 800.0),
            target,
            &mut rng,
        );
        assert!(!retry.success);
        assert!(retry.hit_object);
        assert_eq!(store.len(), 2);
        assert_eq!(store.positions()[index].radius, 60.0);
    }

    #[test]
    fn test_size_tiers() {
        let cases = [
            (30.0, beat_with(false, true, false), true),
            (30.0, beat_with(true, false, true), false),
            (15.0, beat_with(true, true, true), true),
            (15.0, beat_with(true, true, false), false),
        ];
        for (radius, beat, expected) in cases {
            let mut rng = Pcg32::seed_from_u64(5);
            let mut store = test_store();
            let mut effects = Effects::new();
            add_rock(&mut store, 500.0, 300.0, radius);

            let outcome = fire_laser(
                &mut store,
                &mut effects,
                &beat,
                Vec2::new(500.0, 800.0),
                Vec2::new(500.0, 300.0),
                &mut rng,
            );
            assert_eq!(outcome.success, expected, "radius {}", radius);
        }
    }

    #[test]
    fn test_first_object_in_store_order_wins() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut store = test_store();
        let mut effects = Effects::new();
        let first = add_rock(&mut store, 500.0, 300.0, 30.0);
        let second = add_rock(&mut store, 510.0, 300.0, 30.0);

        fire_laser(
            &mut store,
            &mut effects,
            &beat_with(false, false, false),
            Vec2::new(500.0, 800.0),
            Vec2::new(505.0, 300.0),
            &mut rng,
        );
        assert_eq!(store.tags()[first], Tag::Unsplittable);
        assert_eq!(store.tags()[second], Tag::Asteroid);
    }

    #[test]
    fn test_small_split_to_nothing_leaves_remnant() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut store = test_store();
        let mut effects = Effects::new();
        add_rock(&mut store, 500.0, 300.0, 15.0);

        let outcome = fire_laser(
            &mut store,
            &mut effects,
            &beat_with(false, false, true),
            Vec2::new(500.0, 800.0),
            Vec2::new(502.0, 300.0),
            &mut rng,
        );
        assert!(outcome.success);
        assert_eq!(store.len(), 1);
        assert_eq!(effects.remnants.len(), 1);
        assert_eq!(effects.remnants[0].position.center, Vec2::new(502.0, 300.0));
    }
}
