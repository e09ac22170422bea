use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use codetyper::keymap::us_keymap;
use codetyper::playback::{play_plan, resolve_backend, run_typist, PlaybackOptions};
use codetyper::sim;
use codetyper::snippet::Vocabulary;
use codetyper::typist::{plan_session, TypingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    Wayland,
    X11,
}

impl PlaybackBackendArg {
    fn to_library(self) -> codetyper::playback::PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => codetyper::playback::PlaybackBackend::Auto,
            PlaybackBackendArg::Wayland => codetyper::playback::PlaybackBackend::Wayland,
            PlaybackBackendArg::X11 => codetyper::playback::PlaybackBackend::X11,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct TimingArgs {
    /// Shortest pause after each typed character, in milliseconds
    #[arg(long, default_value_t = 20)]
    key_delay_min_ms: u64,

    /// Longest pause after each typed character, in milliseconds
    #[arg(long, default_value_t = 110)]
    key_delay_max_ms: u64,

    /// Shortest "thinking" pause between snippets, in milliseconds
    #[arg(long, default_value_t = 300)]
    think_min_ms: u64,

    /// Longest "thinking" pause between snippets, in milliseconds
    #[arg(long, default_value_t = 1500)]
    think_max_ms: u64,

    /// Optional RNG seed (for debugging)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Args, Clone)]
struct OutputArgs {
    /// Playback backend.
    ///
    /// - auto: choose a backend based on the runtime environment
    /// - wayland: force Wayland playback
    /// - x11: force X11 playback (XTEST)
    #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
    backend: PlaybackBackendArg,

    /// Countdown seconds before the first key is sent
    #[arg(long, default_value_t = 5)]
    countdown: u64,

    /// Wayland seat name to attach the virtual keyboard to (e.g. seat0, seat1).
    #[arg(long, value_name = "NAME")]
    seat: Option<String>,

    /// Disable console typing trace output
    #[arg(long)]
    no_trace: bool,
}

impl OutputArgs {
    fn to_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            backend: self.backend.to_library(),
            seat_name: self.seat.clone(),
            trace: !self.no_trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "codetyper")]
#[command(about = "Types plausible-looking C snippets into the focused window at human speed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate snippets and type them until interrupted
    Run {
        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        timing: TimingArgs,

        /// Stop after this many snippets (default: run forever)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },
    /// Generate a typing plan (JSON) without sending any input
    Plan {
        /// Number of snippets to plan
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        count: u64,

        /// Output plan file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        timing: TimingArgs,
    },
    /// Play a typing plan (JSON)
    Play {
        /// Plan file produced by `codetyper plan`
        #[arg(long, value_name = "PATH")]
        plan: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn build_config(timing: &TimingArgs, countdown: u64, count: Option<u64>) -> TypingConfig {
    TypingConfig {
        key_delay_ms_min: timing.key_delay_min_ms,
        key_delay_ms_max: timing.key_delay_max_ms,
        think_ms_min: timing.think_min_ms,
        think_ms_max: timing.think_max_ms,
        startup_delay_secs: countdown,
        snippet_limit: count,
    }
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            output,
            timing,
            count,
        } => {
            // Fail fast on unsupported environments/backends.
            resolve_backend(output.backend.to_library())?;

            let cfg = build_config(&timing, output.countdown, count);
            let mut rng = rng_from_seed(timing.seed);

            let summary = run_typist(&Vocabulary::default(), &cfg, &output.to_options(), &mut rng)?;
            eprintln!(
                "Done: typed {} snippets ({} characters)",
                summary.snippets, summary.characters
            );
        }
        Command::Plan {
            count,
            output,
            timing,
        } => {
            let cfg = build_config(&timing, 0, Some(count));
            let mut rng = rng_from_seed(timing.seed);
            let keymap = us_keymap()?;

            let plan = plan_session(count, &Vocabulary::default(), &cfg, &keymap, &mut rng)?;

            let stats = sim::stats(&plan);
            eprintln!(
                "Planned: {} snippets, {} actions, {} key events, ~{:.1} min",
                stats.snippets,
                stats.actions,
                stats.key_events,
                (stats.total_wait_ms as f64) / 1000.0 / 60.0,
            );

            let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Play { plan, output } => {
            resolve_backend(output.backend.to_library())?;

            let json = fs::read_to_string(&plan)
                .with_context(|| format!("failed to read {}", plan.display()))?;
            let plan: codetyper::model::Plan =
                serde_json::from_str(&json).context("failed to parse plan JSON")?;
            ensure!(
                plan.version == codetyper::model::PLAN_VERSION,
                "unsupported plan version {}; expected {}",
                plan.version,
                codetyper::model::PLAN_VERSION
            );

            let stats = sim::stats(&plan);
            eprintln!(
                "Playing: {} snippets, {} key events, ~{:.1} min",
                stats.snippets,
                stats.key_events,
                (stats.total_wait_ms as f64) / 1000.0 / 60.0
            );

            play_plan(&plan, output.countdown, &output.to_options())?;
        }
    }

    Ok(())
}
