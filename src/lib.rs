//! Beat Rocks - A rhythm-synchronized asteroid shooter
//!
//! Core modules:
//! - `sim`: Beat-synchronized simulation (beat clock, entity store, collisions, waves)
//! - `snapshot`: Read-only per-frame copies of simulation state for rendering
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod snapshot;
pub mod tuning;

pub use snapshot::RenderSnapshot;
pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Play field dimensions
    pub const ARENA_WIDTH: f32 = 1920.0;
    pub const ARENA_HEIGHT: f32 = 1080.0;
    /// Objects whose bottom edge passes this line damage the player
    pub const HEALTH_LINE_HEIGHT: f32 = ARENA_HEIGHT - 100.0;
    /// Damage dealt by one object crossing the health line
    pub const HEALTH_LINE_DAMAGE: i32 = 2;
    /// Objects may sit this far above the top edge before being culled
    pub const TOP_CULL_MARGIN: f32 = 100.0;

    /// Objects with a radius above this are timed with whole notes
    pub const WHOLE_NOTE_RADIUS_THRESHOLD: f32 = 45.0;
    /// Objects with a radius above this (and not whole-note sized) are timed with half notes
    pub const HALF_NOTE_RADIUS_THRESHOLD: f32 = 20.0;
    /// Radius needed for a hit to produce a three-way split
    pub const TRIPLE_SPLIT_RADIUS_THRESHOLD: f32 = 32.0;
    /// An object shrunk below this radius is destroyed instead
    pub const MIN_RADIUS: f32 = 10.0;

    /// Radius multiplier and extra fragments per split tier
    pub const LARGE_SPLIT_SCALE: f32 = 0.3;
    pub const LARGE_SPLIT_COUNT: usize = 6;
    pub const MEDIUM_SPLIT_SCALE: f32 = 0.4;
    pub const MEDIUM_SPLIT_COUNT: usize = 2;
    pub const SMALL_SPLIT_SCALE: f32 = 0.5;

    /// Fragment speed is `(100..150) * SPLIT_FORCE_SCALE`
    pub const SPLIT_FORCE_MIN: i32 = 100;
    pub const SPLIT_FORCE_SPREAD: i32 = 50;
    pub const SPLIT_FORCE_SCALE: f32 = 0.2;

    /// Spawned objects above the whole-note threshold grow by this factor
    pub const BIG_SPAWN_SCALE: f32 = 1.33;

    /// Maximum simultaneous entities (player included)
    pub const ENTITY_CAPACITY: usize = 512;

    /// Accepted timing offset around a beat (seconds)
    pub const ACCEPTED_OFFSET_SECS: f64 = 0.1;
    /// Window after the beat is `offset * WINDOW_AFTER_BEAT_FACTOR`, before the next beat `offset * WINDOW_BEFORE_BEAT_FACTOR`
    pub const WINDOW_AFTER_BEAT_FACTOR: f64 = 1.25;
    pub const WINDOW_BEFORE_BEAT_FACTOR: f64 = 0.75;
    /// Playback position that must elapse before the clock resynchronizes
    pub const LOAD_GRACE_SECS: f64 = 0.2;
    /// Counters restart slightly negative to absorb output latency
    pub const AUDIO_LATENCY_SECS: f64 = 0.015;
    /// Music fade out when switching tempo
    pub const BEAT_CHANGE_FADE_SECS: f64 = 2.0;

    /// Lifetimes of the visual-only entities (seconds)
    pub const LASER_LIFETIME_SECS: f32 = 0.6;
    pub const SPLIT_FADEOUT_SECS: f32 = 0.33;
    pub const IMPACT_FADEOUT_SECS: f32 = 0.5;
    /// Star lifetime in whole notes
    pub const STAR_LIFETIME_WHOLE_NOTES: f32 = 10.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 45.0;
    pub const PLAYER_MAX_HEALTH: i32 = 12;
    pub const PLAYER_ACCELERATION: f32 = 500.0;
    pub const PLAYER_MAX_SPEED: f32 = 400.0;
    pub const PLAYER_FRICTION: f32 = 2.0;
}

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Unclamped linear interpolation (`t` outside [0, 1] extrapolates)
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!((wrap_degrees(370.0) - 10.0).abs() < 1e-4);
        assert!((wrap_degrees(-10.0) - 350.0).abs() < 1e-4);
        assert!(wrap_degrees(-1e-7) < 360.0);
    }

    #[test]
    fn test_lerp_extrapolates() {
        assert_eq!(lerp(25.0, 5.0, 0.0), 25.0);
        assert_eq!(lerp(25.0, 5.0, 1.0), 5.0);
        assert_eq!(lerp(25.0, 5.0, 2.0), -15.0);
    }
}
