use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use codetyper::keyboard::KEY_LEFTSHIFT;
use codetyper::model::{Action, KeyState};
use codetyper::playback::{AbortCause, KeySink, PlaybackError};
use codetyper::sim::simulate_typed_text;
use codetyper::snippet::Vocabulary;
use codetyper::typist::{run, TypingConfig};

/// Records everything it is sent and never sleeps.
#[derive(Default)]
struct RecordingSink {
    actions: Vec<Action>,
    presses: usize,
    failsafe_after_presses: Option<usize>,
    stop_after_presses: Option<(usize, Arc<AtomicBool>)>,
    fail_on_press: Option<usize>,
    failsafe_error_after_presses: Option<usize>,
    tripped: bool,
    presses_after_trip: usize,
    resets: usize,
}

impl KeySink for RecordingSink {
    fn key(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        if state == KeyState::Pressed {
            if self.fail_on_press == Some(self.presses) {
                return Err(anyhow!("injection failed"));
            }
            self.presses += 1;
            if self.tripped {
                self.presses_after_trip += 1;
            }
            if let Some((n, stop)) = &self.stop_after_presses {
                if self.presses >= *n {
                    stop.store(true, Ordering::SeqCst);
                }
            }
        }
        self.actions.push(Action::Key { keycode, state });
        Ok(())
    }

    fn modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) -> Result<()> {
        self.actions.push(Action::Modifiers {
            mods_depressed: depressed,
            mods_latched: latched,
            mods_locked: locked,
            group,
        });
        Ok(())
    }

    fn wait(&mut self, ms: u64, _stop: &AtomicBool) {
        self.actions.push(Action::Wait { ms });
    }

    fn failsafe_triggered(&mut self) -> Result<bool> {
        if self
            .failsafe_error_after_presses
            .is_some_and(|n| self.presses >= n)
        {
            return Err(anyhow!("pointer query failed"));
        }
        let hit = self
            .failsafe_after_presses
            .is_some_and(|n| self.presses >= n);
        self.tripped |= hit;
        Ok(hit)
    }

    fn reset_modifiers(&mut self) {
        self.resets += 1;
    }
}

fn bounded(count: u64) -> TypingConfig {
    TypingConfig {
        startup_delay_secs: 0,
        snippet_limit: Some(count),
        ..Default::default()
    }
}

#[test]
fn bounded_run_types_the_requested_number_of_snippets() {
    let mut sink = RecordingSink::default();
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(4);

    let summary = run(
        &mut sink,
        &Vocabulary::default(),
        &bounded(6),
        1,
        &mut rng,
        &stop,
        false,
    )
    .expect("bounded run completes");

    assert_eq!(summary.snippets, 6);
    let typed = simulate_typed_text(&sink.actions).unwrap();
    assert_eq!(typed.chars().count() as u64, summary.characters);
    assert_eq!(sink.resets, 0);
}

#[test]
fn failsafe_stops_all_further_key_presses() {
    let mut sink = RecordingSink {
        failsafe_after_presses: Some(17),
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(9);

    // Unbounded: only the failsafe can end this run.
    let err = run(
        &mut sink,
        &Vocabulary::default(),
        &TypingConfig {
            startup_delay_secs: 0,
            ..Default::default()
        },
        1,
        &mut rng,
        &stop,
        false,
    )
    .unwrap_err();

    assert_eq!(PlaybackError::abort_cause(&err), Some(AbortCause::Failsafe));
    assert!(sink.tripped);
    assert_eq!(sink.presses, 17);
    assert_eq!(sink.presses_after_trip, 0);
    assert_eq!(sink.resets, 1);
    assert!(stop.load(Ordering::SeqCst), "failsafe also raises the stop flag");

    // Every character key that went down also came back up; shift is left to reset_modifiers.
    let count = |wanted: KeyState| {
        sink.actions
            .iter()
            .filter(|a| {
                matches!(a, Action::Key { keycode, state }
                    if *state == wanted && *keycode != KEY_LEFTSHIFT)
            })
            .count()
    };
    assert_eq!(count(KeyState::Pressed), count(KeyState::Released));
}

#[test]
fn failsafe_already_tripped_sends_nothing() {
    let mut sink = RecordingSink {
        failsafe_after_presses: Some(0),
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(5);

    let err = run(
        &mut sink,
        &Vocabulary::default(),
        &bounded(3),
        1,
        &mut rng,
        &stop,
        false,
    )
    .unwrap_err();

    assert_eq!(PlaybackError::abort_cause(&err), Some(AbortCause::Failsafe));
    assert!(sink.actions.is_empty());
    assert_eq!(sink.resets, 1);
}

#[test]
fn failing_failsafe_check_still_resets_modifiers() {
    let mut sink = RecordingSink {
        failsafe_error_after_presses: Some(4),
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(6);

    let err = run(
        &mut sink,
        &Vocabulary::default(),
        &bounded(5),
        1,
        &mut rng,
        &stop,
        false,
    )
    .unwrap_err();

    let msg = format!("{err:#}");
    assert!(msg.contains("pointer query failed"), "got: {msg}");
    assert!(msg.contains("failsafe check failed before action"), "got: {msg}");
    assert_eq!(PlaybackError::abort_cause(&err), None);
    assert_eq!(sink.presses, 4);
    assert_eq!(sink.resets, 1);
}

#[test]
fn stop_flag_interrupts_mid_snippet() {
    let stop = Arc::new(AtomicBool::new(false));
    let mut sink = RecordingSink {
        stop_after_presses: Some((5, stop.clone())),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(12);

    let err = run(
        &mut sink,
        &Vocabulary::default(),
        &bounded(100),
        1,
        &mut rng,
        &stop,
        false,
    )
    .unwrap_err();

    assert_eq!(
        PlaybackError::abort_cause(&err),
        Some(AbortCause::Interrupted)
    );
    assert_eq!(sink.presses, 5);
    assert_eq!(sink.resets, 1);
}

#[test]
fn already_stopped_sends_nothing() {
    let mut sink = RecordingSink::default();
    let stop = AtomicBool::new(true);
    let mut rng = StdRng::seed_from_u64(1);

    let err = run(
        &mut sink,
        &Vocabulary::default(),
        &bounded(3),
        1,
        &mut rng,
        &stop,
        false,
    )
    .unwrap_err();

    assert_eq!(
        PlaybackError::abort_cause(&err),
        Some(AbortCause::Interrupted)
    );
    assert!(sink.actions.is_empty());
}

#[test]
fn injection_failure_is_reported_with_context() {
    let mut sink = RecordingSink {
        fail_on_press: Some(3),
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(2);

    let err = run(
        &mut sink,
        &Vocabulary::default(),
        &bounded(2),
        1,
        &mut rng,
        &stop,
        false,
    )
    .unwrap_err();

    let msg = format!("{err:#}");
    assert!(msg.contains("injection failed"), "got: {msg}");
    assert!(msg.contains("playback failed at action"), "got: {msg}");
    assert_eq!(PlaybackError::abort_cause(&err), None);
    assert_eq!(sink.presses, 3);
    assert_eq!(sink.resets, 1);
}

#[test]
fn invalid_configuration_is_rejected_before_typing() {
    let mut sink = RecordingSink::default();
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(1);
    let cfg = TypingConfig {
        key_delay_ms_min: 200,
        key_delay_ms_max: 100,
        ..bounded(1)
    };

    assert!(run(&mut sink, &Vocabulary::default(), &cfg, 1, &mut rng, &stop, false).is_err());
    assert!(sink.actions.is_empty());
}

#[test]
fn invalid_vocabulary_is_rejected_before_typing() {
    let mut sink = RecordingSink::default();
    let stop = AtomicBool::new(false);
    let mut rng = StdRng::seed_from_u64(1);
    let vocab = Vocabulary {
        loop_vars: Vec::new(),
        ..Default::default()
    };

    let err = run(&mut sink, &vocab, &bounded(1), 1, &mut rng, &stop, false).unwrap_err();
    assert!(format!("{err:#}").contains("loop_vars"));
    assert!(sink.actions.is_empty());
}
