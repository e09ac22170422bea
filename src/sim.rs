use anyhow::{anyhow, Result};

use crate::keyboard::{keystroke_to_char, KeyStroke, KEY_LEFTSHIFT, KEY_RIGHTSHIFT};
use crate::model::{Action, KeyState, Plan};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanStats {
    pub actions: usize,
    pub key_events: usize,
    pub modifier_updates: usize,
    pub snippets: usize,
    pub total_wait_ms: u64,
}

pub fn stats(plan: &Plan) -> PlanStats {
    let mut out = PlanStats {
        actions: plan.actions.len(),
        snippets: plan.snippets.len(),
        ..Default::default()
    };

    for a in &plan.actions {
        match a {
            Action::Wait { ms } => {
                out.total_wait_ms = out.total_wait_ms.saturating_add(*ms);
            }
            Action::Modifiers { .. } => out.modifier_updates += 1,
            Action::Key { .. } => out.key_events += 1,
        }
    }

    out
}

/// Text an editor would show after receiving `actions` on a US-QWERTY layout.
///
/// Intended for tests/debugging; editor auto-indent is not modelled.
pub fn simulate_typed_text(actions: &[Action]) -> Result<String> {
    let mut out = String::new();
    let mut shift_down = false;

    for action in actions {
        let Action::Key { keycode, state } = action else {
            continue;
        };

        match (*keycode, *state) {
            (KEY_LEFTSHIFT | KEY_RIGHTSHIFT, state) => {
                shift_down = state == KeyState::Pressed;
            }
            (_, KeyState::Released) => {}
            (keycode, KeyState::Pressed) => {
                let c = keystroke_to_char(KeyStroke {
                    keycode,
                    shift: shift_down,
                })
                .ok_or_else(|| {
                    anyhow!(
                        "simulate_typed_text does not support keycode {keycode} (shift={shift_down})"
                    )
                })?;
                out.push(c);
            }
        }
    }

    Ok(out)
}
