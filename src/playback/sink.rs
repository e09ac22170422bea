use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::model::{Action, KeyState, SnippetMarker};
use crate::playback::util::sleep_interruptible;
use crate::trace::{print_trace_line, snippet_trace_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    /// Ctrl+C or a termination signal.
    Interrupted,
    /// The pointer was parked in a screen corner.
    Failsafe,
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::Interrupted => f.write_str("interrupted"),
            AbortCause::Failsafe => f.write_str("failsafe triggered (pointer in screen corner)"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("aborted: {0}")]
    Aborted(AbortCause),
}

impl PlaybackError {
    /// The abort cause, if `err` is a playback abort.
    pub fn abort_cause(err: &anyhow::Error) -> Option<AbortCause> {
        match err.downcast_ref::<PlaybackError>() {
            Some(PlaybackError::Aborted(cause)) => Some(*cause),
            None => None,
        }
    }
}

/// Something that can deliver keyboard events to the focused window.
pub trait KeySink {
    fn key(&mut self, keycode: u32, state: KeyState) -> Result<()>;

    fn modifiers(
        &mut self,
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        group: u32,
    ) -> Result<()>;

    fn wait(&mut self, ms: u64, stop: &AtomicBool) {
        sleep_interruptible(stop, ms);
    }

    /// Whether the operator asked for an emergency stop.
    fn failsafe_triggered(&mut self) -> Result<bool> {
        Ok(false)
    }

    /// Best-effort release of any modifier that might be held.
    fn reset_modifiers(&mut self);
}

fn check_stop(sink: &mut dyn KeySink, stop: &AtomicBool) -> Result<Option<AbortCause>> {
    if stop.load(Ordering::SeqCst) {
        return Ok(Some(AbortCause::Interrupted));
    }
    if sink.failsafe_triggered()? {
        stop.store(true, Ordering::SeqCst);
        return Ok(Some(AbortCause::Failsafe));
    }
    Ok(None)
}

/// Play `actions` against `sink`.
///
/// Stop conditions are checked before every wait and key press. Key releases are
/// always delivered so no key is left held down.
pub fn execute_actions(
    sink: &mut dyn KeySink,
    actions: &[Action],
    snippets: &[SnippetMarker],
    stop: &AtomicBool,
    trace: bool,
) -> Result<()> {
    let mut next_snippet = 0usize;

    for (action_index, action) in actions.iter().enumerate() {
        let releasing = matches!(
            action,
            Action::Key {
                state: KeyState::Released,
                ..
            }
        );
        if !releasing {
            match check_stop(sink, stop) {
                Ok(None) => {}
                Ok(Some(cause)) => {
                    eprintln!("Aborted ({cause}). Attempting to reset modifiers...");
                    sink.reset_modifiers();
                    return Err(PlaybackError::Aborted(cause).into());
                }
                Err(e) => {
                    eprintln!("Failsafe check failed. Attempting to reset modifiers...");
                    sink.reset_modifiers();
                    return Err(
                        e.context(format!("failsafe check failed before action {action_index}"))
                    );
                }
            }
        }

        while next_snippet < snippets.len() && snippets[next_snippet].action_index <= action_index
        {
            if trace {
                let marker = &snippets[next_snippet];
                print_trace_line(&snippet_trace_line(marker.kind, &marker.text));
            }
            next_snippet += 1;
        }

        let result = match action {
            Action::Wait { ms } => {
                sink.wait(*ms, stop);
                Ok(())
            }
            Action::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
            } => sink.modifiers(*mods_depressed, *mods_latched, *mods_locked, *group),
            Action::Key { keycode, state } => sink.key(*keycode, *state),
        };

        if let Err(e) = result {
            eprintln!("Playback error. Attempting to reset modifiers...");
            sink.reset_modifiers();
            return Err(e.context(format!("playback failed at action {action_index}")));
        }
    }

    Ok(())
}
