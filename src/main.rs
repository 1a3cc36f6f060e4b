//! Beat Rocks headless driver
//!
//! Runs the simulation with simulated music playback and an autopilot that
//! shoots on quarter notes, then logs a summary of the run.
//!
//! Log filtering follows `RUST_LOG` (defaults to `info`).

use std::path::PathBuf;
use std::process::ExitCode;

use beat_rocks::consts::*;
use beat_rocks::sim::{
    GameEvent, GamePhase, GameState, SimulatedPlayback, TickInput, autopilot_target, tick,
};
use beat_rocks::{RenderSnapshot, Tuning, TuningError};
use clap::Parser;

/// Render frame rate the driver pretends to run at
const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "beat-rocks")]
#[command(about = "Headless Beat Rocks run with an on-beat autopilot")]
struct Cli {
    /// Tuning JSON; built-in defaults when omitted
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Run seed
    #[arg(long, default_value_t = 0xBEA7)]
    seed: u64,
    /// Simulated run length in seconds
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,
}

fn load_tuning(cli: &Cli) -> Result<Tuning, TuningError> {
    match &cli.tuning {
        Some(path) => Tuning::load(path),
        None => Ok(Tuning::default()),
    }
}

/// Headless game loop with the fixed-step accumulator
struct Driver {
    state: GameState,
    playback: SimulatedPlayback,
    accumulator: f32,
    input: TickInput,
    frames: u64,
    games_over: u32,
    peak_objects: usize,
}

impl Driver {
    fn new(tuning: Tuning, seed: u64) -> Self {
        let mut playback = SimulatedPlayback::new();
        let mut state = GameState::new(tuning, seed);
        state.start(&mut playback);
        Self {
            state,
            playback,
            accumulator: 0.0,
            input: TickInput::default(),
            frames: 0,
            games_over: 0,
            peak_objects: 0,
        }
    }

    fn frame(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            tick(&mut self.state, &mut self.playback, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot inputs are consumed by a single tick
            self.input.shoot = None;
            self.input.restart = false;

            self.handle_events();
        }

        let snapshot = RenderSnapshot::capture(&self.state);
        self.peak_objects = self.peak_objects.max(snapshot.objects.len());
        self.frames += 1;
    }

    fn handle_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::QuarterNote { .. } => {
                    if self.state.phase == GamePhase::Playing {
                        self.input.shoot = autopilot_target(&self.state);
                    }
                }
                GameEvent::WaveAdvanced { wave } => log::debug!("Wave {} queued", wave),
                GameEvent::LevelCleared { level } => log::info!("Level cleared, next level {}", level),
                GameEvent::TempoTransitionStarted => {
                    log::info!("Tempo transition from '{}'", self.state.clock.current_beat().name)
                }
                GameEvent::GameOver => {
                    self.games_over += 1;
                    self.input.restart = true;
                }
                GameEvent::ShotFired { .. } | GameEvent::HealthLineImpact { .. } => {}
            }
        }
    }

    fn log_summary(&self) {
        let stats = self.state.stats;
        log::info!("Frames: {} ({} ticks)", self.frames, self.state.time_ticks);
        log::info!(
            "Shots: {} fired, {} on beat, {} hit an object",
            stats.shots_fired,
            stats.shots_on_beat,
            stats.objects_hit
        );
        log::info!(
            "Health: {}/{} after {} impacts, {} game over(s)",
            self.state.player.remaining_health,
            self.state.player.max_health,
            stats.health_line_impacts,
            self.games_over
        );
        log::info!(
            "Level {} wave {}, {} live objects (peak {})",
            self.state.scheduler.level(),
            self.state.scheduler.wave_index(),
            self.state.store.len(),
            self.peak_objects
        );
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Beat Rocks (headless) starting...");

    let cli = Cli::parse();
    let tuning = match load_tuning(&cli) {
        Ok(tuning) => tuning,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut driver = Driver::new(tuning, cli.seed);
    let frames = (cli.seconds.max(0.0) / FRAME_DT).ceil() as u64;
    for _ in 0..frames {
        driver.frame(FRAME_DT);
    }
    driver.log_summary();
    ExitCode::SUCCESS
}
