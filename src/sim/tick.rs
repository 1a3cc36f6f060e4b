//! Per-frame simulation step
//!
//! Frame order while playing:
//! 1. player velocity from input
//! 2. collision pass (sort, move, rotate, age effects)
//! 3. beat clock (publishes quarter notes)
//! 4. wave scheduler (spawns land after this frame's collision pass)
//! 5. destruction check (health line, out of bounds)
//! 6. shot resolution
//!
//! While paused or after game over only the clock, rotation and effect
//! lifetimes advance.

use glam::Vec2;

use super::beat::{MusicPlayback, NoteValue};
use super::physics::{check_destruction, rotate_objects, update_objects};
use super::player::MoveInput;
use super::shot::{fire_laser, laser_origin};
use super::state::{GameEvent, GamePhase, GameState};
use super::waves::{WaveContext, WaveEvent};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pressed movement directions
    pub movement: MoveInput,
    /// Fire a laser at this point
    pub shoot: Option<Vec2>,
    /// Pause toggle
    pub pause: bool,
    /// Cycle to the next tempo
    pub change_beat: bool,
    /// Start over after game over
    pub restart: bool,
}

/// Advance the game by `dt` seconds
pub fn tick(state: &mut GameState, playback: &mut dyn MusicPlayback, input: &TickInput, dt: f32) {
    state.time_ticks += 1;
    playback.advance(f64::from(dt));

    if input.pause {
        match state.phase {
            GamePhase::Playing => state.pause(),
            GamePhase::Paused => state.resume(),
            GamePhase::GameOver => {}
        }
    }
    if input.restart && state.phase == GamePhase::GameOver {
        state.restart(playback);
    }
    if input.change_beat && state.phase != GamePhase::GameOver {
        state.change_beat(playback);
    }

    if state.phase != GamePhase::Playing {
        let whole_note = state.clock.snapshot().whole_note_length as f32;
        rotate_objects(&mut state.store, dt);
        state.effects.update_lifetimes(dt, whole_note);
        state.clock.update(f64::from(dt), playback);
        state.forward_quarter_notes();
        return;
    }

    let velocity = state.player.update(&input.movement, dt);
    state.store.set_player_velocity(velocity);

    let whole_note = state.clock.snapshot().whole_note_length as f32;
    update_objects(&mut state.store, &mut state.effects, dt, whole_note);

    state.clock.update(f64::from(dt), playback);
    state.forward_quarter_notes();

    run_scheduler(state, playback);
    apply_destruction(state);

    if state.phase != GamePhase::Playing {
        return;
    }
    if let Some(target) = input.shoot {
        shoot(state, target);
    }
}

fn run_scheduler(state: &mut GameState, playback: &mut dyn MusicPlayback) {
    let player_alive = state.player.is_alive();
    let mut ctx = WaveContext {
        clock: &mut state.clock,
        playback: &mut *playback,
        store: &mut state.store,
        rng: &mut state.rng,
        player_alive,
    };
    let wave_events = state.scheduler.process(&mut ctx);

    for event in wave_events {
        match event {
            WaveEvent::Spawned(_) => {}
            WaveEvent::WaveAdvanced(wave) => state.push_event(GameEvent::WaveAdvanced { wave }),
            WaveEvent::LevelComplete(level) => state.push_event(GameEvent::LevelCleared { level }),
            WaveEvent::TempoChangeRequested => state.push_event(GameEvent::TempoTransitionStarted),
        }
    }
}

fn apply_destruction(state: &mut GameState) {
    let report = check_destruction(&mut state.store, &mut state.effects, &state.arena);
    if report.health_line_impacts == 0 {
        return;
    }

    let damage = state.tuning.health_line_damage;
    for _ in 0..report.health_line_impacts {
        state.player.take_damage(damage);
        state.push_event(GameEvent::HealthLineImpact { damage });
    }
    state.stats.health_line_impacts += report.health_line_impacts;
    log::debug!(
        "{} object(s) crossed the health line, {} health left",
        report.health_line_impacts,
        state.player.remaining_health
    );

    if !state.player.is_alive() {
        state.scheduler.pause(&mut state.clock);
        state.phase = GamePhase::GameOver;
        state.push_event(GameEvent::GameOver);
        log::info!(
            "Game over at level {} wave {}",
            state.scheduler.level(),
            state.scheduler.wave_index()
        );
    }
}

fn shoot(state: &mut GameState, target: Vec2) {
    let player = state.store.player_position();
    let origin = laser_origin(&player, target);
    let beat = state.clock.snapshot();
    let outcome = fire_laser(
        &mut state.store,
        &mut state.effects,
        &beat,
        origin,
        target,
        &mut state.rng,
    );

    state.player.record_shot(outcome.success);
    state.stats.shots_fired += 1;
    if outcome.success {
        state.stats.shots_on_beat += 1;
    }
    if outcome.hit_object {
        state.stats.objects_hit += 1;
    }
    state.push_event(GameEvent::ShotFired {
        success: outcome.success,
    });
}

/// Aim point for demo play: the lowest splittable object whose timing window
/// is open right now, if any.
pub fn autopilot_target(state: &GameState) -> Option<Vec2> {
    let beat = state.clock.snapshot();
    let player = state.store.player_index();

    (0..state.store.len())
        .filter(|&i| i != player && state.store.is_splittable(i))
        .map(|i| state.store.positions()[i])
        .filter(|circle| circle.bottom() > 0.0 && beat.is_active(NoteValue::for_radius(circle.radius)))
        .max_by(|a, b| {
            a.bottom()
                .partial_cmp(&b.bottom())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|circle| circle.center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::consts::*;
    use crate::sim::beat::SimulatedPlayback;
    use crate::sim::entity::tests::add_rock;
    use crate::sim::entity::Tag;
    use crate::sim::geometry::Circle;
    use crate::sim::waves::SchedulerState;

    fn started(seed: u64) -> (GameState, SimulatedPlayback) {
        let mut playback = SimulatedPlayback::new();
        let mut state = GameState::new(Tuning::default(), seed);
        state.start(&mut playback);
        (state, playback)
    }

    #[test]
    fn test_spawns_begin_after_loading() {
        let (mut state, mut playback) = started(12345);
        let input = TickInput::default();

        let mut quarter_notes = 0;
        for _ in 0..600 {
            tick(&mut state, &mut playback, &input, SIM_DT);
            quarter_notes += state
                .drain_events()
                .iter()
                .filter(|e| matches!(e, GameEvent::QuarterNote { .. }))
                .count();
            if state.store.len() > 1 {
                break;
            }
        }

        assert!(quarter_notes >= 1);
        assert!(state.store.len() > 1);
        assert_eq!(state.scheduler.state(), SchedulerState::Active);
    }

    #[test]
    fn test_spawn_does_not_move_in_its_own_frame() {
        let (mut state, mut playback) = started(5);
        let input = TickInput::default();

        for _ in 0..600 {
            tick(&mut state, &mut playback, &input, SIM_DT);
            if state.store.len() > 1 {
                break;
            }
        }
        let player = state.store.player_index();
        let index = (0..state.store.len())
            .find(|i| *i != player)
            .expect("an object spawned");
        let center = state.store.positions()[index].center;
        // Spawn coordinates are whole numbers until the next collision pass
        assert_eq!(center.x.fract(), 0.0);
        assert_eq!(center.y.fract(), 0.0);
    }

    #[test]
    fn test_pause_freezes_collisions_but_not_music() {
        let (mut state, mut playback) = started(1);
        let idle = TickInput::default();
        for _ in 0..60 {
            tick(&mut state, &mut playback, &idle, SIM_DT);
        }
        let rock = add_rock(&mut state.store, 400.0, 300.0, 30.0);
        state.store.velocities[rock] = Vec2::new(0.0, 40.0);
        state.store.rotations[rock].force = 90.0;

        let toggle = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &mut playback, &toggle, SIM_DT);
        assert_eq!(state.phase, GamePhase::Paused);
        assert_eq!(state.scheduler.state(), SchedulerState::Idle);

        let before = state.store.positions().to_vec();
        let beat_before = state.clock.snapshot().time_since_quarter_note;
        // Resume between two quarter notes so nothing activates on the way back
        for _ in 0..118 {
            tick(&mut state, &mut playback, &idle, SIM_DT);
        }
        assert_eq!(state.store.positions(), &before[..]);
        assert_ne!(state.clock.snapshot().time_since_quarter_note, beat_before);
        let spun = (0..state.store.len()).any(|i| state.store.rotations()[i].angle > 0.0);
        assert!(spun);

        tick(&mut state, &mut playback, &toggle, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.scheduler.state(), SchedulerState::Armed);
    }

    #[test]
    fn test_health_line_impact_damages_once() {
        // Never started: the clock stays loading and nothing spawns
        let mut playback = SimulatedPlayback::new();
        let mut state = GameState::new(Tuning::default(), 2);
        add_rock(&mut state.store, 400.0, 300.0, 60.0);
        let input = TickInput::default();

        let mut impacts = Vec::new();
        for _ in 0..5_000 {
            tick(&mut state, &mut playback, &input, SIM_DT);
            impacts.extend(
                state
                    .drain_events()
                    .into_iter()
                    .filter(|e| matches!(e, GameEvent::HealthLineImpact { .. })),
            );
            if state.store.len() == 1 {
                break;
            }
        }

        assert_eq!(
            impacts,
            vec![GameEvent::HealthLineImpact {
                damage: HEALTH_LINE_DAMAGE
            }]
        );
        assert_eq!(state.player.remaining_health, PLAYER_MAX_HEALTH - HEALTH_LINE_DAMAGE);
        assert_eq!(state.effects.remnants.len(), 1);
        assert_eq!(state.effects.remnants[0].position.radius, 60.0);
        assert_eq!(state.stats.health_line_impacts, 1);
    }

    #[test]
    fn test_game_over_and_restart() {
        let (mut state, mut playback) = started(4);
        state.player.remaining_health = HEALTH_LINE_DAMAGE;
        add_rock(&mut state.store, 400.0, 940.0, 30.0);
        let input = TickInput::default();

        for _ in 0..600 {
            tick(&mut state, &mut playback, &input, SIM_DT);
            if state.phase == GamePhase::GameOver {
                break;
            }
        }
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.scheduler.state(), SchedulerState::Idle);
        assert!(state.drain_events().contains(&GameEvent::GameOver));

        // Shots and pause are ignored after game over
        let ignored = TickInput {
            shoot: Some(Vec2::new(100.0, 100.0)),
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &mut playback, &ignored, SIM_DT);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.effects.lasers.is_empty());

        let restart = TickInput {
            restart: true,
            ..Default::default()
        };
        tick(&mut state, &mut playback, &restart, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.remaining_health, PLAYER_MAX_HEALTH);
        assert_eq!(state.store.len(), 1);
    }

    #[test]
    fn test_shot_records_event_and_laser() {
        let (mut state, mut playback) = started(6);
        let input = TickInput {
            shoot: Some(Vec2::new(960.0, 100.0)),
            ..Default::default()
        };
        tick(&mut state, &mut playback, &input, SIM_DT);

        let events = state.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::ShotFired { .. }))
        );
        assert_eq!(state.effects.lasers.len(), 1);
        let laser = state.effects.lasers[0];
        assert!((laser.start - Vec2::new(960.0, 830.0 - PLAYER_RADIUS)).length() < 1.0);
        assert_eq!(laser.end, Vec2::new(960.0, 100.0));
        assert_eq!(state.stats.shots_fired, 1);
    }

    #[test]
    fn test_movement_moves_player() {
        let mut playback = SimulatedPlayback::new();
        let mut state = GameState::new(Tuning::default(), 8);
        let input = TickInput {
            movement: MoveInput {
                right: true,
                ..Default::default()
            },
            ..Default::default()
        };
        for _ in 0..60 {
            tick(&mut state, &mut playback, &input, SIM_DT);
        }
        assert!(state.player_center().x > 960.0);
        assert_eq!(state.player_center().y, 830.0);
    }

    #[test]
    fn test_change_beat_input() {
        let (mut state, mut playback) = started(9);
        let input = TickInput {
            change_beat: true,
            ..Default::default()
        };
        tick(&mut state, &mut playback, &input, SIM_DT);
        assert!(state.clock.is_changing_beat());
        assert!(state.drain_events().contains(&GameEvent::TempoTransitionStarted));

        // The fade completes, the next beat installs and the clock reloads
        let idle = TickInput::default();
        for _ in 0..600 {
            tick(&mut state, &mut playback, &idle, SIM_DT);
        }
        assert!(!state.clock.is_changing_beat());
        assert_eq!(state.clock.current_beat_index(), 1);
        assert_eq!(state.clock.current_beat().bpm, 120);
    }

    #[test]
    fn test_autopilot_respects_tiers() {
        let mut state = GameState::new(Tuning::default(), 10);
        add_rock(&mut state.store, 300.0, 300.0, 60.0);
        let small = add_rock(&mut state.store, 600.0, 200.0, 15.0);

        // Freshly built clock: every window closed
        assert_eq!(autopilot_target(&state), None);

        state.store.lock_out(small);
        assert_eq!(autopilot_target(&state), None);
        assert_eq!(state.store.tags()[small], Tag::Unsplittable);
    }

    #[test]
    fn test_determinism() {
        let run = |seed: u64| {
            let (mut state, mut playback) = started(seed);
            let mut events = Vec::new();
            for frame in 0..2_400u32 {
                let shoot = if frame % 30 == 0 {
                    autopilot_target(&state).or(Some(Vec2::new(960.0, 200.0)))
                } else {
                    None
                };
                let input = TickInput {
                    shoot,
                    movement: MoveInput {
                        left: frame % 400 < 200,
                        right: frame % 400 >= 200,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                tick(&mut state, &mut playback, &input, SIM_DT);
                events.extend(state.drain_events());
            }
            let positions: Vec<Circle> = state.store.positions().to_vec();
            (positions, events, state.stats)
        };

        let a = run(99);
        let b = run(99);
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
        assert_eq!(a.2, b.2);
        assert!(a.2.shots_fired > 0);
    }
}
