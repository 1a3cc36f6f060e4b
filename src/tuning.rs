//! Game balance and tempo tables
//!
//! Every tuned number of the simulation lives here with a name. The defaults
//! reproduce the constants in [`crate::consts`]; a JSON file can override any
//! subset of them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::beat::{Beat, default_beats};
use crate::sim::physics::Arena;
use crate::sim::player::PlayerMotion;
use crate::sim::waves::{SpawnArea, Wave, default_waves};

/// Errors from loading or validating a tuning file
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("Tuning parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Tuning IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid tuning: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Tempo ===
    /// Tempo table; the first entry plays first and level changes cycle through it
    pub beats: Vec<Beat>,
    /// Slack around each beat for an on-beat action (seconds)
    pub accepted_offset_secs: f64,

    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    pub health_line_height: f32,
    pub health_line_damage: i32,
    /// Maximum live objects, player included
    pub entity_capacity: usize,
    pub asteroid_texture_count: u16,
    pub starting_star_count: usize,

    // === Player ===
    pub player_radius: f32,
    pub player_max_health: i32,
    pub player_acceleration: f32,
    pub player_max_speed: f32,
    pub player_friction: f32,

    // === Waves ===
    pub waves: Vec<Wave>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            beats: default_beats(),
            accepted_offset_secs: ACCEPTED_OFFSET_SECS,

            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            health_line_height: HEALTH_LINE_HEIGHT,
            health_line_damage: HEALTH_LINE_DAMAGE,
            entity_capacity: ENTITY_CAPACITY,
            asteroid_texture_count: 4,
            starting_star_count: 50,

            player_radius: PLAYER_RADIUS,
            player_max_health: PLAYER_MAX_HEALTH,
            player_acceleration: PLAYER_ACCELERATION,
            player_max_speed: PLAYER_MAX_SPEED,
            player_friction: PLAYER_FRICTION,

            waves: default_waves(),
        }
    }
}

impl Tuning {
    /// Parse and validate JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject tables the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.beats.is_empty() {
            return Err(TuningError::Invalid("beat table is empty".into()));
        }
        for beat in &self.beats {
            if beat.bpm == 0 {
                return Err(TuningError::Invalid(format!("beat '{}' has 0 bpm", beat.name)));
            }
            if beat.time_signature == 0 {
                return Err(TuningError::Invalid(format!(
                    "beat '{}' has a time signature of 0",
                    beat.name
                )));
            }
        }
        if self.waves.is_empty() {
            return Err(TuningError::Invalid("wave table is empty".into()));
        }
        for (i, wave) in self.waves.iter().enumerate() {
            if wave.interval == 0 {
                return Err(TuningError::Invalid(format!("wave {} has a 0 interval", i)));
            }
            if wave.total_spawns == 0 {
                return Err(TuningError::Invalid(format!("wave {} spawns nothing", i)));
            }
        }
        if self.entity_capacity < 2 {
            return Err(TuningError::Invalid(format!(
                "entity capacity {} leaves no room beside the player",
                self.entity_capacity
            )));
        }
        if self.accepted_offset_secs <= 0.0 {
            return Err(TuningError::Invalid(format!(
                "accepted offset must be positive, got {}",
                self.accepted_offset_secs
            )));
        }
        Ok(())
    }

    pub fn arena(&self) -> Arena {
        Arena {
            width: self.arena_width,
            height: self.arena_height,
            health_line: self.health_line_height,
            top_margin: TOP_CULL_MARGIN,
        }
    }

    pub fn spawn_area(&self) -> SpawnArea {
        SpawnArea {
            width: self.arena_width,
            texture_count: self.asteroid_texture_count,
        }
    }

    pub fn player_motion(&self) -> PlayerMotion {
        PlayerMotion {
            acceleration: self.player_acceleration,
            max_speed: self.player_max_speed,
            friction: self.player_friction,
        }
    }
}
