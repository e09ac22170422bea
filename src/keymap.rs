use anyhow::{anyhow, Result};
use xkbcommon::xkb;

pub const KEYMAP_FORMAT_XKB_V1: u32 = 1;

/// Compiled US keymap, as uploaded to Wayland compositors.
#[derive(Debug, Clone)]
pub struct KeymapInfo {
    pub layout: String,
    pub keymap_format: u32,
    pub keymap: String,
    pub shift_mask: u32,
}

fn modifier_mask(keymap: &xkb::Keymap, name: &str) -> Result<u32> {
    let index = keymap.mod_get_index(name);
    if index == xkb::MOD_INVALID {
        return Err(anyhow!("xkb keymap missing {name} modifier"));
    }
    1u32.checked_shl(index)
        .ok_or_else(|| anyhow!("{name} modifier index {index} out of range"))
}

pub fn us_keymap() -> Result<KeymapInfo> {
    let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
    let keymap = xkb::Keymap::new_from_names(
        &context,
        "evdev",
        "pc105",
        "us",
        "",
        None,
        xkb::KEYMAP_COMPILE_NO_FLAGS,
    )
    .ok_or_else(|| anyhow!("failed to compile xkb keymap for us/pc105"))?;

    Ok(KeymapInfo {
        layout: "us".to_string(),
        keymap_format: KEYMAP_FORMAT_XKB_V1,
        shift_mask: modifier_mask(&keymap, xkb::MOD_NAME_SHIFT)?,
        keymap: keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1),
    })
}
