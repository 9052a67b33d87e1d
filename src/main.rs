//! Lane Runner headless driver
//!
//! Runs a seeded session on autopilot at a fixed 60 Hz step and prints the
//! final report as JSON.
//!
//! Usage: `lane-runner [--seed N] [--seconds S] [--preset casual|standard|hardcore]
//! [--character ID] [--tuning FILE]`

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::process::ExitCode;

    use lane_runner::consts::SIM_DT;
    use lane_runner::sim::{
        GameEvent, GameOverReport, PowerUpKind, RunObserver, RunPhase, RunState, StatsSnapshot, TickInput,
        tick_observed,
    };
    use lane_runner::{CharacterProfile, DifficultyPreset, Tuning, TuningError};

    struct Options {
        seed: u64,
        seconds: f32,
        preset: DifficultyPreset,
        character: CharacterProfile,
        tuning_path: Option<String>,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                seed: 1,
                seconds: 120.0,
                preset: DifficultyPreset::Standard,
                character: CharacterProfile::default(),
                tuning_path: None,
            }
        }
    }

    fn parse_args() -> Result<Options, String> {
        let mut opts = Options::default();
        let mut args = std::env::args().skip(1);
        while let Some(flag) = args.next() {
            let value = args
                .next()
                .ok_or_else(|| format!("missing value for {flag}"))?;
            match flag.as_str() {
                "--seed" => opts.seed = value.parse().map_err(|e| format!("bad seed: {e}"))?,
                "--seconds" => {
                    opts.seconds = value.parse().map_err(|e| format!("bad duration: {e}"))?
                }
                "--preset" => {
                    opts.preset = DifficultyPreset::from_str(&value)
                        .ok_or_else(|| format!("unknown preset {value}"))?
                }
                "--character" => {
                    opts.character = CharacterProfile::named(&value)
                        .ok_or_else(|| format!("unknown character {value}"))?
                }
                "--tuning" => opts.tuning_path = Some(value),
                _ => return Err(format!("unknown flag {flag}")),
            }
        }
        Ok(opts)
    }

    fn load_tuning(opts: &Options) -> Result<Tuning, TuningError> {
        let mut tuning = match &opts.tuning_path {
            Some(path) => Tuning::from_path(path)?,
            None => Tuning::default(),
        };
        tuning.apply_preset(opts.preset);
        Ok(tuning)
    }

    /// Logs what the HUD, audio and analytics sinks would receive
    #[derive(Default)]
    struct LogObserver {
        last_stats: Option<StatsSnapshot>,
        report: Option<GameOverReport>,
    }

    impl RunObserver for LogObserver {
        fn on_game_over(&mut self, report: &GameOverReport) {
            self.report = Some(report.clone());
        }

        fn on_power_up(&mut self, kind: PowerUpKind, is_pickup: bool) {
            if is_pickup {
                log::info!("picked up {}", kind.as_str());
            } else {
                log::info!("{} absorbed a hit", kind.as_str());
            }
        }

        fn on_stats_update(&mut self, stats: &StatsSnapshot) {
            self.last_stats = Some(stats.clone());
        }

        fn on_event(&mut self, event: &GameEvent) {
            match event {
                GameEvent::Damaged { kind, damage, health, .. } => {
                    log::info!("hit by {} for {damage}, health {health}", kind.as_str())
                }
                GameEvent::PerfectSection { bonus } => log::info!("perfect section +{bonus}"),
                GameEvent::EnergyModeActivated => log::info!("energy mode!"),
                GameEvent::WorldEventStarted { kind } => log::info!("{} incoming", kind.as_str()),
                other => log::trace!("{other:?}"),
            }
        }
    }

    pub fn run() -> ExitCode {
        let opts = match parse_args() {
            Ok(o) => o,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        };
        let tuning = match load_tuning(&opts) {
            Ok(t) => t,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        };

        log::info!(
            "Lane Runner (headless) seed {} preset {} for {:.0}s",
            opts.seed,
            opts.preset.as_str(),
            opts.seconds
        );
        let mut state = RunState::with_character(opts.seed, tuning, opts.character);
        let mut observer = LogObserver::default();
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };

        let steps = (opts.seconds / SIM_DT).ceil() as u64;
        for _ in 0..steps {
            tick_observed(&mut state, &input, SIM_DT, &mut observer);
            if state.phase == RunPhase::GameOver {
                break;
            }
        }

        let summary = match observer.report {
            Some(report) => serde_json::to_string_pretty(&report),
            None => serde_json::to_string_pretty(
                &observer.last_stats.unwrap_or_else(|| state.snapshot(false)),
            ),
        };
        match summary {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("failed to serialize summary: {e}");
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Embedders drive the library directly on wasm
}
