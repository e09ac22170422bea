pub mod backends;
pub mod sink;
mod util;

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::keymap::{us_keymap, KeymapInfo};
use crate::model::Plan;
use crate::snippet::Vocabulary;
use crate::typist::{self, validate_config, RunSummary, TypingConfig};

pub use sink::{execute_actions, AbortCause, KeySink, PlaybackError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    Wayland,
    X11,
}

#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub backend: PlaybackBackend,
    pub seat_name: Option<String>,
    pub trace: bool,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> PlaybackBackend {
    let wayland_env = env_is_set("WAYLAND_DISPLAY") || env_is_set("WAYLAND_SOCKET");
    let x11_env = env_is_set("DISPLAY");

    // Prefer Wayland if both are present (Xwayland sessions set DISPLAY too).
    if wayland_env {
        if cfg!(feature = "wayland") {
            return PlaybackBackend::Wayland;
        }
        if cfg!(feature = "x11") && x11_env {
            return PlaybackBackend::X11;
        }
        // Surfaced as "detected but disabled" by the caller.
        return PlaybackBackend::Wayland;
    }

    if x11_env {
        return PlaybackBackend::X11;
    }

    PlaybackBackend::Auto
}

fn session_description() -> String {
    let mut parts = Vec::new();
    for name in ["WAYLAND_DISPLAY", "WAYLAND_SOCKET", "DISPLAY"] {
        if env_is_set(name) {
            parts.push(format!("{name} is set"));
        }
    }
    if let Ok(session) = std::env::var("XDG_SESSION_TYPE") {
        if !session.is_empty() {
            parts.push(format!("XDG_SESSION_TYPE={session}"));
        }
    }

    if parts.is_empty() {
        "No display session detected (expected Wayland or X11 environment variables).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn disabled_backend_error(name: &str, feature: &str, selected: PlaybackBackend) -> anyhow::Error {
    let how = match selected {
        PlaybackBackend::Auto => "detected",
        _ => "requested",
    };
    anyhow!(
        "{name} backend {how} but is disabled in this build. (Rebuild with `--features {feature}`.) {}",
        session_description()
    )
}

fn require_supported_backend(selected: PlaybackBackend, resolved: PlaybackBackend) -> Result<()> {
    match resolved {
        PlaybackBackend::Wayland if !cfg!(feature = "wayland") => {
            Err(disabled_backend_error("Wayland", "wayland", selected))
        }
        PlaybackBackend::X11 if !cfg!(feature = "x11") => {
            Err(disabled_backend_error("X11", "x11", selected))
        }
        PlaybackBackend::Wayland | PlaybackBackend::X11 => Ok(()),
        PlaybackBackend::Auto => {
            let mut forced = Vec::new();
            if cfg!(feature = "wayland") {
                forced.push("--backend wayland");
            }
            if cfg!(feature = "x11") {
                forced.push("--backend x11");
            }
            let hint = match forced.len() {
                0 => "This build has no playback backends enabled.",
                1 => "Try passing the available backend flag to force it.",
                _ => "Try forcing a backend.",
            };

            Err(anyhow!(
                "No supported playback backend detected. {}\n{hint} {}",
                session_description(),
                forced.join(" or "),
            ))
        }
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let resolved = match requested {
        PlaybackBackend::Auto => auto_backend(),
        other => other,
    };

    require_supported_backend(requested, resolved)?;
    Ok(resolved)
}

pub fn preflight_backend(
    requested: PlaybackBackend,
    seat_name: Option<&str>,
) -> Result<PlaybackBackend> {
    if seat_name.is_some_and(|name| name.trim().is_empty()) {
        return Err(anyhow!("--seat must not be empty"));
    }

    let resolved = resolve_backend(requested)?;

    if seat_name.is_some() && resolved == PlaybackBackend::X11 {
        return Err(anyhow!("--seat is Wayland-only and is not supported on X11"));
    }

    Ok(resolved)
}

#[allow(unused_variables)]
fn open_sink(
    backend: PlaybackBackend,
    keymap: &KeymapInfo,
    seat_name: Option<&str>,
) -> Result<Box<dyn KeySink>> {
    match backend {
        #[cfg(feature = "wayland")]
        PlaybackBackend::Wayland => Ok(Box::new(backends::wayland::WaylandSink::connect(
            keymap, seat_name,
        )?)),
        #[cfg(feature = "x11")]
        PlaybackBackend::X11 => Ok(Box::new(backends::x11::X11Sink::connect()?)),
        other => Err(anyhow!("playback backend {other:?} is not available in this build")),
    }
}

/// Replay a saved plan into the focused window.
pub fn play_plan(plan: &Plan, countdown_secs: u64, opts: &PlaybackOptions) -> Result<()> {
    let backend = preflight_backend(opts.backend, opts.seat_name.as_deref())?;
    let stop = util::install_stop_handler()?;

    util::countdown(&stop, countdown_secs)?;

    let keymap = KeymapInfo {
        layout: plan.config.layout.clone(),
        keymap_format: plan.config.keymap_format,
        keymap: plan.config.keymap.clone(),
        shift_mask: 0,
    };
    let mut sink = open_sink(backend, &keymap, opts.seat_name.as_deref())?;

    execute_actions(
        sink.as_mut(),
        &plan.actions,
        &plan.snippets,
        &stop,
        opts.trace,
    )
}

/// Type freshly generated snippets into the focused window until stopped.
///
/// Waits `cfg.startup_delay_secs` before the first key event.
pub fn run_typist(
    vocab: &Vocabulary,
    cfg: &TypingConfig,
    opts: &PlaybackOptions,
    rng: &mut impl Rng,
) -> Result<RunSummary> {
    vocab.validate()?;
    validate_config(cfg)?;

    let backend = preflight_backend(opts.backend, opts.seat_name.as_deref())?;
    let keymap = us_keymap()?;
    let stop = util::install_stop_handler()?;

    util::countdown(&stop, cfg.startup_delay_secs)?;

    let mut sink = open_sink(backend, &keymap, opts.seat_name.as_deref())?;

    typist::run(
        sink.as_mut(),
        vocab,
        cfg,
        keymap.shift_mask,
        rng,
        &stop,
        opts.trace,
    )
}
