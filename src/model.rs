use serde::{Deserialize, Serialize};

use crate::snippet::SnippetKind;

pub const PLAN_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub config: PlanConfig,
    pub actions: Vec<Action>,
    /// Where each snippet starts in `actions`, for console tracing.
    #[serde(default)]
    pub snippets: Vec<SnippetMarker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub layout: String,
    pub keymap_format: u32,
    pub keymap: String,
    pub key_delay_ms_min: u64,
    pub key_delay_ms_max: u64,
    pub think_ms_min: u64,
    pub think_ms_max: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetMarker {
    pub action_index: usize,
    pub kind: SnippetKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Wait {
        ms: u64,
    },
    Modifiers {
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        group: u32,
    },
    Key {
        keycode: u32,
        state: KeyState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    Pressed,
    Released,
}
