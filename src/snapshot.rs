//! Read-only per-frame copy of the simulation for rendering
//!
//! A renderer never holds a reference into the live entity store. Each frame
//! it receives an owned [`RenderSnapshot`] whose instance arrays are plain
//! `#[repr(C)]` data that can be uploaded to the GPU as-is.

use bytemuck::{Pod, Zeroable};

use crate::sim::beat::BeatSnapshot;
use crate::sim::entity::Tag;
use crate::sim::state::{GamePhase, GameState};

/// One textured, rotated circle (object or fading remnant)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectInstance {
    pub center: [f32; 2],
    pub radius: f32,
    /// Degrees
    pub angle: f32,
    pub tint: [f32; 4],
    pub texture: u32,
    /// 1.0 for live objects, fading to 0.0 for remnants
    pub opacity: f32,
    pub scale_offset: f32,
    pub is_player: u32,
}

/// Laser trail segment
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LaserInstance {
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub color: [f32; 4],
    pub opacity: f32,
    pub _pad: [f32; 3],
}

/// Background star; `size` already follows the beat pulse
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StarInstance {
    pub position: [f32; 2],
    pub size: f32,
    pub opacity: f32,
    pub color: [f32; 4],
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub objects: Vec<ObjectInstance>,
    pub remnants: Vec<ObjectInstance>,
    pub lasers: Vec<LaserInstance>,
    pub stars: Vec<StarInstance>,
    pub beat: BeatSnapshot,
    pub player_health: i32,
    pub player_max_health: i32,
    pub health_line: f32,
    pub paused: bool,
    pub game_over: bool,
    pub level: u32,
    pub wave: usize,
}

impl RenderSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let store = &state.store;
        let player = store.player_index();

        let objects = (0..store.len())
            .map(|i| {
                let circle = store.positions()[i];
                let appearance = store.appearances()[i];
                ObjectInstance {
                    center: circle.center.to_array(),
                    radius: circle.radius,
                    angle: store.rotations()[i].angle,
                    tint: appearance.tint.to_f32(),
                    texture: u32::from(appearance.texture.0),
                    opacity: 1.0,
                    scale_offset: store.scale_offsets()[i],
                    is_player: u32::from(i == player && store.tags()[i] == Tag::Player),
                }
            })
            .collect();

        let remnants = state
            .effects
            .remnants
            .iter()
            .map(|remnant| ObjectInstance {
                center: remnant.position.center.to_array(),
                radius: remnant.position.radius,
                angle: remnant.angle,
                tint: remnant.appearance.tint.to_f32(),
                texture: u32::from(remnant.appearance.texture.0),
                opacity: 1.0 - remnant.lifetime.progress(),
                scale_offset: 0.0,
                is_player: 0,
            })
            .collect();

        let lasers = state
            .effects
            .lasers
            .iter()
            .map(|laser| LaserInstance {
                start: laser.start.to_array(),
                end: laser.end.to_array(),
                color: laser.color.to_f32(),
                opacity: 1.0 - laser.lifetime.progress(),
                _pad: [0.0; 3],
            })
            .collect();

        let beat = state.clock.snapshot();
        let whole_note = beat.whole_note_length as f32;
        let stars = state
            .effects
            .stars
            .iter()
            .map(|star| {
                let limit = whole_note * star.lifetime.total;
                let age = if limit > 0.0 {
                    (star.lifetime.elapsed / limit).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                StarInstance {
                    position: star.pos.to_array(),
                    size: (star.max_size * beat.pulse_multiplier).clamp(1.0, star.max_size.max(1.0)),
                    opacity: 1.0 - age,
                    color: star.color.to_f32(),
                }
            })
            .collect();

        Self {
            objects,
            remnants,
            lasers,
            stars,
            beat,
            player_health: state.player.remaining_health,
            player_max_health: state.player.max_health,
            health_line: state.arena.health_line,
            paused: state.phase == GamePhase::Paused,
            game_over: state.phase == GamePhase::GameOver,
            level: state.scheduler.level(),
            wave: state.scheduler.wave_index(),
        }
    }

    /// Raw bytes of the object instances, ready for a vertex buffer
    pub fn object_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.objects)
    }

    pub fn laser_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lasers)
    }
}
