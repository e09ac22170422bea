use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::keyboard::{char_to_keystroke, find_first_unsupported_char, KeyStroke, KEY_LEFTSHIFT};
use crate::keymap::KeymapInfo;
use crate::model::{Action, KeyState, Plan, PlanConfig, SnippetMarker, PLAN_VERSION};
use crate::playback::sink::{execute_actions, AbortCause, KeySink, PlaybackError};
use crate::snippet::{random_snippet, Snippet, Vocabulary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingConfig {
    pub key_delay_ms_min: u64,
    pub key_delay_ms_max: u64,
    pub think_ms_min: u64,
    pub think_ms_max: u64,
    pub startup_delay_secs: u64,
    /// Stop after this many snippets; `None` types until interrupted.
    pub snippet_limit: Option<u64>,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            key_delay_ms_min: 20,
            key_delay_ms_max: 110,
            think_ms_min: 300,
            think_ms_max: 1500,
            startup_delay_secs: 5,
            snippet_limit: None,
        }
    }
}

pub fn validate_config(cfg: &TypingConfig) -> Result<()> {
    ensure!(
        cfg.key_delay_ms_min <= cfg.key_delay_ms_max,
        "key_delay_ms_min must be <= key_delay_ms_max"
    );
    ensure!(
        cfg.think_ms_min <= cfg.think_ms_max,
        "think_ms_min must be <= think_ms_max"
    );
    ensure!(
        cfg.snippet_limit != Some(0),
        "snippet_limit must be at least 1 when set"
    );
    Ok(())
}

fn sample_ms(min: u64, max: u64, rng: &mut impl Rng) -> u64 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

#[derive(Debug, Clone)]
struct ActionBuilder {
    actions: Vec<Action>,
    shift_down: bool,
    shift_mask: u32,
}

impl ActionBuilder {
    fn new(shift_mask: u32) -> Self {
        Self {
            actions: Vec::new(),
            shift_down: false,
            shift_mask,
        }
    }

    fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    fn wait(&mut self, ms: u64) {
        self.actions.push(Action::Wait { ms });
    }

    fn key(&mut self, keycode: u32, state: KeyState) {
        self.actions.push(Action::Key { keycode, state });
    }

    fn set_shift(&mut self, down: bool) {
        if self.shift_down == down {
            return;
        }
        let state = if down {
            KeyState::Pressed
        } else {
            KeyState::Released
        };
        self.key(KEY_LEFTSHIFT, state);
        self.shift_down = down;
        self.actions.push(Action::Modifiers {
            mods_depressed: if down { self.shift_mask } else { 0 },
            mods_latched: 0,
            mods_locked: 0,
            group: 0,
        });
    }

    fn type_char(&mut self, stroke: KeyStroke) {
        self.set_shift(stroke.shift);
        self.key(stroke.keycode, KeyState::Pressed);
        self.key(stroke.keycode, KeyState::Released);
    }
}

/// Turn one snippet into keyboard actions.
///
/// Every character is followed by one key-delay wait; the snippet ends with shift
/// released and a single think pause.
pub fn plan_snippet(
    text: &str,
    cfg: &TypingConfig,
    shift_mask: u32,
    rng: &mut impl Rng,
) -> Result<Vec<Action>> {
    if let Some((idx, c)) = find_first_unsupported_char(text) {
        return Err(anyhow!(
            "snippet contains a character that cannot be typed on a US layout at byte {idx}: {c:?}"
        ));
    }

    let mut b = ActionBuilder::new(shift_mask);
    for c in text.chars() {
        let stroke =
            char_to_keystroke(c).ok_or_else(|| anyhow!("no keystroke for {c:?}"))?;
        b.type_char(stroke);
        b.wait(sample_ms(cfg.key_delay_ms_min, cfg.key_delay_ms_max, rng));
    }
    b.set_shift(false);
    b.wait(sample_ms(cfg.think_ms_min, cfg.think_ms_max, rng));

    Ok(b.into_actions())
}

/// Generate `count` snippets and the full action sequence that types them.
pub fn plan_session(
    count: u64,
    vocab: &Vocabulary,
    cfg: &TypingConfig,
    keymap: &KeymapInfo,
    rng: &mut impl Rng,
) -> Result<Plan> {
    vocab.validate()?;
    validate_config(cfg)?;

    let mut actions = Vec::new();
    let mut snippets = Vec::new();

    for _ in 0..count {
        let snippet = random_snippet(vocab, rng);
        snippets.push(SnippetMarker {
            action_index: actions.len(),
            kind: snippet.kind,
            text: snippet.text.clone(),
        });
        actions.extend(plan_snippet(&snippet.text, cfg, keymap.shift_mask, rng)?);
    }

    Ok(Plan {
        version: PLAN_VERSION,
        config: PlanConfig {
            layout: keymap.layout.clone(),
            keymap_format: keymap.keymap_format,
            keymap: keymap.keymap.clone(),
            key_delay_ms_min: cfg.key_delay_ms_min,
            key_delay_ms_max: cfg.key_delay_ms_max,
            think_ms_min: cfg.think_ms_min,
            think_ms_max: cfg.think_ms_max,
        },
        actions,
        snippets,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub snippets: u64,
    pub characters: u64,
}

/// Generate and type snippets until the limit is reached or a stop cause fires.
///
/// Returns `PlaybackError::Aborted` (wrapped in `anyhow`) on Ctrl+C or failsafe.
pub fn run(
    sink: &mut dyn KeySink,
    vocab: &Vocabulary,
    cfg: &TypingConfig,
    shift_mask: u32,
    rng: &mut impl Rng,
    stop: &AtomicBool,
    trace: bool,
) -> Result<RunSummary> {
    vocab.validate()?;
    validate_config(cfg)?;

    let mut summary = RunSummary::default();

    loop {
        if cfg.snippet_limit.is_some_and(|limit| summary.snippets >= limit) {
            return Ok(summary);
        }
        if stop.load(Ordering::SeqCst) {
            return Err(PlaybackError::Aborted(AbortCause::Interrupted).into());
        }

        let snippet: Snippet = random_snippet(vocab, rng);
        let actions = plan_snippet(&snippet.text, cfg, shift_mask, rng)?;
        let marker = SnippetMarker {
            action_index: 0,
            kind: snippet.kind,
            text: snippet.text,
        };

        execute_actions(sink, &actions, std::slice::from_ref(&marker), stop, trace)?;

        summary.snippets += 1;
        summary.characters += marker.text.chars().count() as u64;
    }
}
