//! Game state and top-level simulation types
//!
//! `GameState` owns every simulation component. Music playback is external
//! and passed in by the caller wherever the clock needs it.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::beat::{BeatClock, MusicPlayback, SubscriptionToken};
use super::effects::Effects;
use super::entity::{Appearance, Color, EntityStore, TextureId};
use super::geometry::Circle;
use super::physics::Arena;
use super::player::Player;
use super::waves::WaveScheduler;
use crate::tuning::Tuning;

/// Texture handle reserved for the player ship
pub const PLAYER_TEXTURE: TextureId = TextureId(u16::MAX);

/// Player spawn height above the health line
const PLAYER_START_ABOVE_HEALTH_LINE: f32 = 150.0;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Collisions frozen and spawner detached; music, spin and fades continue
    Paused,
    /// Player health reached zero; waits for a restart
    GameOver,
}

/// Fire-and-forget notifications for audio and visual feedback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    ShotFired { success: bool },
    HealthLineImpact { damage: i32 },
    TempoTransitionStarted,
    QuarterNote { index: u32 },
    /// Next wave (0-based) queued
    WaveAdvanced { wave: usize },
    /// All waves of a level spawned; `level` is the level that comes next
    LevelCleared { level: u32 },
    GameOver,
}

/// Counters for the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub shots_fired: u32,
    pub shots_on_beat: u32,
    pub objects_hit: u32,
    pub health_line_impacts: u32,
}

/// Complete simulation state
#[derive(Debug)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub arena: Arena,
    pub store: EntityStore,
    pub effects: Effects,
    pub clock: BeatClock,
    pub scheduler: WaveScheduler,
    pub player: Player,
    pub phase: GamePhase,
    pub stats: RunStats,
    /// Simulation tick counter
    pub time_ticks: u64,
    events: Vec<GameEvent>,
    /// Own subscription, forwarding quarter notes as events
    beat_subscription: SubscriptionToken,
}

impl GameState {
    /// Build a state from validated tuning. Nothing plays until [`GameState::start`].
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let arena = tuning.arena();

        let player = Player::new(tuning.player_radius, tuning.player_max_health, tuning.player_motion());
        let store = EntityStore::new(
            tuning.entity_capacity,
            Self::player_start(&arena, player.radius),
            Self::player_appearance(),
        );

        let mut effects = Effects::new();
        effects.spawn_starting_stars(tuning.starting_star_count, arena.width, arena.height, &mut rng);

        let mut clock = BeatClock::new(tuning.beats.clone(), tuning.accepted_offset_secs);
        let beat_subscription = clock.quarter_notes().subscribe();
        let scheduler = WaveScheduler::new(tuning.waves.clone(), tuning.spawn_area());

        Self {
            seed,
            rng,
            tuning,
            arena,
            store,
            effects,
            clock,
            scheduler,
            player,
            phase: GamePhase::Playing,
            stats: RunStats::default(),
            time_ticks: 0,
            events: Vec::new(),
            beat_subscription,
        }
    }

    fn player_start(arena: &Arena, radius: f32) -> Circle {
        Circle::new(
            arena.width / 2.0,
            arena.health_line - PLAYER_START_ABOVE_HEALTH_LINE,
            radius,
        )
    }

    fn player_appearance() -> Appearance {
        Appearance {
            texture: PLAYER_TEXTURE,
            tint: Color::WHITE,
        }
    }

    /// Start the music and attach the wave scheduler
    pub fn start(&mut self, playback: &mut dyn MusicPlayback) {
        self.clock.start_playing(playback);
        self.scheduler.start(&mut self.clock);
        log::info!(
            "Run started (seed {}, beat '{}')",
            self.seed,
            self.clock.current_beat().name
        );
    }

    /// Freeze gameplay. No-op unless playing.
    pub fn pause(&mut self) {
        if self.phase == GamePhase::Playing {
            self.scheduler.pause(&mut self.clock);
            self.phase = GamePhase::Paused;
            log::debug!("Paused");
        }
    }

    /// Resume gameplay. No-op unless paused.
    pub fn resume(&mut self) {
        if self.phase == GamePhase::Paused {
            self.scheduler.start(&mut self.clock);
            self.phase = GamePhase::Playing;
            log::debug!("Resumed");
        }
    }

    /// Request the next tempo in the table
    pub fn change_beat(&mut self, playback: &mut dyn MusicPlayback) {
        if self.clock.change_beat(None, playback) {
            self.events.push(GameEvent::TempoTransitionStarted);
        }
    }

    /// Fresh run: full health, empty board, first tempo, first wave
    pub fn restart(&mut self, playback: &mut dyn MusicPlayback) {
        self.player.reset();
        self.store.clear();
        self.store.place_player(Self::player_start(&self.arena, self.player.radius).center);
        self.store.set_player_tint(Color::WHITE);

        self.effects.clear();
        let (width, height) = (self.arena.width, self.arena.height);
        self.effects
            .spawn_starting_stars(self.tuning.starting_star_count, width, height, &mut self.rng);

        if self.clock.change_beat(Some(0), playback) {
            self.events.push(GameEvent::TempoTransitionStarted);
        }
        self.scheduler.restart(&mut self.clock);
        self.stats = RunStats::default();
        self.phase = GamePhase::Playing;
        log::info!("Run restarted");
    }

    pub fn player_center(&self) -> Vec2 {
        self.store.player_position().center
    }

    pub(super) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Forward quarter notes delivered to the state's own subscription
    pub(super) fn forward_quarter_notes(&mut self) {
        let notes = self.clock.quarter_notes().drain(&self.beat_subscription);
        self.events
            .extend(notes.into_iter().map(|note| GameEvent::QuarterNote { index: note.index }));
    }

    /// Take all events raised since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::beat::SimulatedPlayback;
    use crate::sim::entity::Tag;
    use crate::sim::waves::SchedulerState;

    #[test]
    fn test_new_state_layout() {
        let state = GameState::new(Tuning::default(), 42);

        assert_eq!(state.store.len(), 1);
        assert_eq!(state.store.tags()[state.store.player_index()], Tag::Player);
        assert_eq!(state.player_center(), Vec2::new(960.0, 830.0));
        assert_eq!(state.effects.stars.len(), 50);
        assert_eq!(state.scheduler.state(), SchedulerState::Idle);
        assert_eq!(state.player.remaining_health, PLAYER_MAX_HEALTH);
    }

    #[test]
    fn test_same_seed_same_stars() {
        let a = GameState::new(Tuning::default(), 7);
        let b = GameState::new(Tuning::default(), 7);
        let c = GameState::new(Tuning::default(), 8);
        assert_eq!(a.effects.stars, b.effects.stars);
        assert_ne!(a.effects.stars, c.effects.stars);
    }

    #[test]
    fn test_pause_resume_toggle_subscription() {
        let mut playback = SimulatedPlayback::new();
        let mut state = GameState::new(Tuning::default(), 1);
        state.start(&mut playback);
        // State's own subscription plus the scheduler's
        assert_eq!(state.clock.quarter_notes().subscriber_count(), 2);

        state.pause();
        state.pause();
        assert_eq!(state.phase, GamePhase::Paused);
        assert_eq!(state.clock.quarter_notes().subscriber_count(), 1);

        state.resume();
        state.resume();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.clock.quarter_notes().subscriber_count(), 2);
    }

    #[test]
    fn test_restart_resets_run() {
        let mut playback = SimulatedPlayback::new();
        let mut state = GameState::new(Tuning::default(), 3);
        state.start(&mut playback);
        state.player.take_damage(PLAYER_MAX_HEALTH);
        state.phase = GamePhase::GameOver;
        state.store.place_player(Vec2::new(10.0, 10.0));

        state.restart(&mut playback);

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.remaining_health, PLAYER_MAX_HEALTH);
        assert_eq!(state.player_center(), Vec2::new(960.0, 830.0));
        assert_eq!(state.scheduler.level(), 1);
        assert!(state.clock.is_changing_beat());
        assert!(state.drain_events().contains(&GameEvent::TempoTransitionStarted));
        assert!(state.drain_events().is_empty());
    }
}
