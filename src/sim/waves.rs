//! Wave scheduler
//!
//! Spawns objects on quarter notes according to a table of waves. The
//! scheduler owns its subscription to the clock's quarter-note bus: while
//! detached (paused, game over) nothing is delivered and nothing spawns.
//!
//! State machine:
//! - `Idle`: not subscribed
//! - `Armed`: subscribed, waiting for quarter note 2 of a bar outside a tempo change
//! - `Active`: spawning with the current wave's cadence
//! - `AwaitingLevelChange`: all waves spawned, waiting for the board to clear

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::beat::{BeatClock, MusicPlayback, QuarterNote, SubscriptionToken};
use super::entity::{Appearance, EntityStore, Rotation, Tag};
use super::geometry::Circle;
use crate::consts::*;

/// Quarter note of the bar on which an armed scheduler activates
const ACTIVATION_QUARTER_NOTE: u32 = 2;

/// One scripted batch of spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    /// Quarter notes between spawns
    pub interval: u32,
    /// Spawns in this wave
    pub total_spawns: u32,
    /// Quarter notes between this wave's last spawn and the next wave's first
    pub delay: u32,
}

impl Wave {
    pub const fn new(interval: u32, total_spawns: u32, delay: u32) -> Self {
        Self {
            interval,
            total_spawns,
            delay,
        }
    }
}

/// Waves of one level
pub fn default_waves() -> Vec<Wave> {
    vec![
        Wave::new(4, 2, 8),
        Wave::new(2, 4, 8),
        Wave::new(2, 4, 16),
        Wave::new(2, 8, 25),
        Wave::new(2, 2, 2),
        Wave::new(1, 4, 16),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Armed,
    Active,
    AwaitingLevelChange,
}

/// Things the scheduler did while handling quarter notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveEvent {
    /// An object was created at this slot
    Spawned(usize),
    /// The next wave (0-based) starts after its delay
    WaveAdvanced(usize),
    /// Every wave of the level has spawned; the level counter moved on
    LevelComplete(u32),
    /// The board cleared and a tempo change was requested
    TempoChangeRequested,
}

/// Where and how spawned objects look
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    pub width: f32,
    pub texture_count: u16,
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            texture_count: 4,
        }
    }
}

/// Mutable world the scheduler acts on for one frame
pub struct WaveContext<'a, R: Rng + ?Sized> {
    pub clock: &'a mut BeatClock,
    pub playback: &'a mut dyn MusicPlayback,
    pub store: &'a mut EntityStore,
    pub rng: &'a mut R,
    /// Dead players get no more spawns
    pub player_alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct WaveProgress {
    spawn_count: u32,
    big_spawned: bool,
}

#[derive(Debug)]
pub struct WaveScheduler {
    waves: Vec<Wave>,
    progress: Vec<WaveProgress>,
    area: SpawnArea,
    subscription: Option<SubscriptionToken>,
    activated: bool,
    waiting_for_level_change: bool,
    wave_index: usize,
    /// Quarter notes since the last spawn; negative during an inter-wave delay
    quarter_note_count: i64,
    level: u32,
}

impl WaveScheduler {
    /// Create a detached scheduler at level 1. An empty table uses the defaults.
    pub fn new(waves: Vec<Wave>, area: SpawnArea) -> Self {
        let waves = if waves.is_empty() {
            log::warn!("Empty wave table, using default waves");
            default_waves()
        } else {
            waves
        };
        let progress = vec![WaveProgress::default(); waves.len()];
        Self {
            waves,
            progress,
            area,
            subscription: None,
            activated: false,
            waiting_for_level_change: false,
            wave_index: 0,
            quarter_note_count: 0,
            level: 1,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.subscription.is_none() {
            SchedulerState::Idle
        } else if self.activated {
            SchedulerState::Active
        } else if self.waiting_for_level_change {
            SchedulerState::AwaitingLevelChange
        } else {
            SchedulerState::Armed
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn wave_index(&self) -> usize {
        self.wave_index
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Spawns so far in the current wave
    pub fn spawn_count(&self) -> u32 {
        self.progress[self.wave_index].spawn_count
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Attach to the clock's quarter notes. No-op if already attached.
    pub fn start(&mut self, clock: &mut BeatClock) {
        if self.subscription.is_none() {
            self.subscription = Some(clock.quarter_notes().subscribe());
        }
        self.quarter_note_count = 0;
    }

    /// Detach from the clock and deactivate. No-op if already detached.
    pub fn pause(&mut self, clock: &mut BeatClock) {
        if let Some(token) = self.subscription.take() {
            clock.quarter_notes().unsubscribe(token);
        }
        self.activated = false;
    }

    /// Back to the first wave of level 1, attached and armed
    pub fn restart(&mut self, clock: &mut BeatClock) {
        self.reset_waves();
        self.quarter_note_count = 0;
        self.wave_index = 0;
        self.level = 1;
        self.activated = false;
        self.waiting_for_level_change = false;
        self.start(clock);
    }

    fn reset_waves(&mut self) {
        self.progress.fill(WaveProgress::default());
    }

    /// Handle every quarter note delivered since the last call
    pub fn process<R: Rng + ?Sized>(&mut self, ctx: &mut WaveContext<'_, R>) -> Vec<WaveEvent> {
        let mut events = Vec::new();
        let Some(token) = self.subscription.as_ref() else {
            return events;
        };
        let notes = ctx.clock.quarter_notes().drain(token);
        for note in notes {
            self.on_quarter_note(note, ctx, &mut events);
        }
        events
    }

    fn on_quarter_note<R: Rng + ?Sized>(
        &mut self,
        note: QuarterNote,
        ctx: &mut WaveContext<'_, R>,
        events: &mut Vec<WaveEvent>,
    ) {
        if !self.activated {
            if self.waiting_for_level_change && ctx.store.len() <= 1 {
                ctx.clock.change_beat(None, &mut *ctx.playback);
                self.waiting_for_level_change = false;
                events.push(WaveEvent::TempoChangeRequested);
                return;
            }
            if note.index == ACTIVATION_QUARTER_NOTE
                && !self.waiting_for_level_change
                && !ctx.clock.is_changing_beat()
            {
                self.activated = true;
                log::debug!("Wave scheduler active (level {}, wave {})", self.level, self.wave_index);
            } else {
                return;
            }
        }

        self.quarter_note_count += 1;
        let wave = self.waves[self.wave_index];
        let first_spawn = self.progress[self.wave_index].spawn_count == 0 && self.quarter_note_count == 1;
        if self.quarter_note_count <= i64::from(wave.interval) && !first_spawn {
            return;
        }

        self.quarter_note_count = 1;
        self.progress[self.wave_index].spawn_count += 1;
        if let Some(slot) = self.spawn(ctx) {
            events.push(WaveEvent::Spawned(slot));
        }

        if self.progress[self.wave_index].spawn_count < wave.total_spawns {
            return;
        }

        self.quarter_note_count = 1 - i64::from(wave.delay);
        self.wave_index += 1;
        if self.wave_index < self.waves.len() {
            log::debug!("Wave {} of level {} queued", self.wave_index, self.level);
            events.push(WaveEvent::WaveAdvanced(self.wave_index));
            return;
        }

        self.level += 1;
        self.wave_index = 0;
        self.reset_waves();
        self.activated = false;
        self.waiting_for_level_change = true;
        self.quarter_note_count = 0;
        log::info!("All waves spawned, level {} next", self.level);
        events.push(WaveEvent::LevelComplete(self.level));
    }

    /// Create one object with level-scaled randomness
    fn spawn<R: Rng + ?Sized>(&mut self, ctx: &mut WaveContext<'_, R>) -> Option<usize> {
        if !ctx.player_alive {
            return None;
        }
        let wave = self.waves[self.wave_index];
        let progress = self.progress[self.wave_index];
        let rng = &mut *ctx.rng;
        let level = self.level as i32;

        let force_big = progress.spawn_count == wave.total_spawns && !progress.big_spawned && self.wave_index > 1;
        let force_small = progress.big_spawned || self.wave_index < 2;

        let width = self.area.width as i32;
        let x = rng.random_range(0..(width - width / 3).max(1)) + width / 6;
        let x_velocity = rng.random_range(0..80) - 40;
        let y_velocity = rng.random_range(0..(10 + 20 * level)) + 20 * level;

        let whole = WHOLE_NOTE_RADIUS_THRESHOLD as i32;
        let half = HALF_NOTE_RADIUS_THRESHOLD as i32;
        let mut size = if force_small {
            rng.random_range(0..(whole - half - 4)) + half + 5
        } else if force_big {
            whole + 1
        } else {
            rng.random_range(0..30) + half + 1
        } as f32;
        if size > WHOLE_NOTE_RADIUS_THRESHOLD {
            size *= BIG_SPAWN_SCALE;
            self.progress[self.wave_index].big_spawned = true;
        }

        let torque = rng.random_range(0..30) - 15;
        let angle = rng.random_range(0..360);
        let y = rng.random_range(0..150) + 50;
        let appearance = Appearance::random_asteroid(rng, self.area.texture_count);

        let slot = ctx.store.create(
            Circle::new(x as f32, y as f32, size),
            Rotation::new(torque as f32, angle as f32),
            Vec2::new(x_velocity as f32, y_velocity as f32),
            0.0,
            appearance,
            Tag::Asteroid,
        );
        if slot.is_some() {
            log::debug!("Spawned r={:.1} at x={} (wave {}, level {})", size, x, self.wave_index, self.level);
        }
        slot
    }
}
