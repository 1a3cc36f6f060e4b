//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Seeded RNG only
//! - Stable iteration order (entity store array order)
//! - No rendering, audio or platform dependencies; music playback is reached
//!   through the [`MusicPlayback`] trait

pub mod beat;
pub mod effects;
pub mod entity;
pub mod geometry;
pub mod physics;
pub mod player;
pub mod shot;
pub mod state;
pub mod tick;
pub mod waves;

pub use beat::{
    Beat, BeatClock, BeatSnapshot, MusicPlayback, NoteValue, QuarterNote, QuarterNoteBus,
    SimulatedPlayback, SubscriptionToken, default_beats,
};
pub use effects::{Effects, FadingRemnant, Laser, Lifetime, Star};
pub use entity::{Appearance, Color, EntityStore, Rotation, SplitOutcome, Tag, TextureId};
pub use geometry::{Circle, CircleContact, circle_intersect, normalize, point_in_circle};
pub use physics::{Arena, DestructionReport, check_destruction, move_objects, rotate_objects, update_objects};
pub use player::{MoveInput, Player, PlayerMotion};
pub use shot::{ShotOutcome, fire_laser, laser_origin};
pub use state::{GameEvent, GamePhase, GameState, RunStats};
pub use tick::{TickInput, autopilot_target, tick};
pub use waves::{SchedulerState, SpawnArea, Wave, WaveEvent, WaveScheduler, default_waves};
