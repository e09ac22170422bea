use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GetInputFocusReply};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use crate::model::KeyState;
use crate::playback::sink::KeySink;

// Pixels from the edge that still count as "in the corner".
const FAILSAFE_MARGIN: i16 = 1;

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn key_state_to_x11_event_type(state: KeyState) -> u8 {
    match state {
        KeyState::Pressed => xproto::KEY_PRESS_EVENT,
        KeyState::Released => xproto::KEY_RELEASE_EVENT,
    }
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn get_focus(conn: &impl Connection) -> Result<GetInputFocusReply> {
    conn.get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")
}

fn require_explicit_focus(conn: &impl Connection) -> Result<()> {
    // X11 special focus value: PointerRoot means the focused window follows the pointer.
    const POINTER_ROOT: xproto::Window = 1;

    let focus = get_focus(conn)?;
    if focus.focus == x11rb::NONE {
        return Err(anyhow!(
            "no X11 input focus detected; click into the target editor before starting"
        ));
    }
    if focus.focus == POINTER_ROOT {
        return Err(anyhow!(
            "X11 input focus is set to PointerRoot; click into the target editor window to give it explicit focus before starting"
        ));
    }
    Ok(())
}

fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    // Braces and semicolons are the characters most likely to differ on non-US layouts.
    let checks: &[(u32, char, char)] = &[
        (crate::keyboard::KEY_A, 'a', 'A'),
        (crate::keyboard::KEY_SEMICOLON, ';', ':'),
        (crate::keyboard::KEY_LEFTBRACE, '[', '{'),
        (crate::keyboard::KEY_RIGHTBRACE, ']', '}'),
        (crate::keyboard::KEY_9, '9', '('),
        (crate::keyboard::KEY_COMMA, ',', '<'),
    ];

    for &(evdev, unshifted, shifted) in checks {
        let keycode = evdev_to_x11_keycode(evdev)?;
        let reply = conn
            .get_keyboard_mapping(keycode, 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;

        if reply.keysyms_per_keycode == 0 {
            return Err(anyhow!("X server returned 0 keysyms per keycode"));
        }

        // For Latin-1, X11 keysyms match the character code.
        let got0 = reply.keysyms.first().copied().unwrap_or(x11rb::NO_SYMBOL);
        let got1 = reply.keysyms.get(1).copied().unwrap_or(x11rb::NO_SYMBOL);
        if got0 != unshifted as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but keycode {keycode} maps to {got0:#x}/{got1:#x} (expected {unshifted:?}/{shifted:?}). Try `setxkbmap us`."
            ));
        }
    }

    Ok(())
}

/// XTEST-backed sink. The failsafe fires when the pointer sits in a screen corner.
pub struct X11Sink {
    conn: RustConnection,
    root: xproto::Window,
    width: i16,
    height: i16,
}

impl X11Sink {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;
        require_explicit_focus(&conn)?;

        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?;
        let root = screen.root;
        let width = i16::try_from(screen.width_in_pixels).unwrap_or(i16::MAX);
        let height = i16::try_from(screen.height_in_pixels).unwrap_or(i16::MAX);

        let mut sink = Self {
            conn,
            root,
            width,
            height,
        };
        // A previous aborted run may have left a modifier down.
        sink.reset_modifiers();
        Ok(sink)
    }

    fn fake_key(&self, keycode: u8, state: KeyState) -> Result<()> {
        self.conn
            .xtest_fake_input(
                key_state_to_x11_event_type(state),
                keycode,
                x11rb::CURRENT_TIME,
                self.root,
                0,
                0,
                0,
            )
            .context("failed to send XTEST fake input")?;
        Ok(())
    }
}

pub(crate) fn in_corner(x: i16, y: i16, width: i16, height: i16) -> bool {
    let near_left = x <= FAILSAFE_MARGIN - 1;
    let near_top = y <= FAILSAFE_MARGIN - 1;
    let near_right = x >= width.saturating_sub(FAILSAFE_MARGIN);
    let near_bottom = y >= height.saturating_sub(FAILSAFE_MARGIN);
    (near_left || near_right) && (near_top || near_bottom)
}

impl KeySink for X11Sink {
    fn key(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        let keycode = evdev_to_x11_keycode(keycode)?;
        self.fake_key(keycode, state)?;
        self.conn
            .flush()
            .context("failed to flush X11 connection")?;
        Ok(())
    }

    fn modifiers(&mut self, _: u32, _: u32, _: u32, _: u32) -> Result<()> {
        // X11 derives modifier state from the shift key presses themselves.
        Ok(())
    }

    fn failsafe_triggered(&mut self) -> Result<bool> {
        let pointer = self
            .conn
            .query_pointer(self.root)
            .context("failed to request pointer position")?
            .reply()
            .context("failed to read pointer position")?;
        Ok(in_corner(
            pointer.root_x,
            pointer.root_y,
            self.width,
            self.height,
        ))
    }

    fn reset_modifiers(&mut self) {
        for keycode in super::COMMON_MODIFIER_KEYCODES {
            if let Ok(code) = evdev_to_x11_keycode(keycode) {
                let _ = self.fake_key(code, KeyState::Released);
            }
        }
        let _ = self.conn.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_trigger_and_edges_do_not() {
        assert!(in_corner(0, 0, 1920, 1080));
        assert!(in_corner(1919, 0, 1920, 1080));
        assert!(in_corner(0, 1079, 1920, 1080));
        assert!(in_corner(1919, 1079, 1920, 1080));

        assert!(!in_corner(0, 500, 1920, 1080));
        assert!(!in_corner(900, 0, 1920, 1080));
        assert!(!in_corner(900, 500, 1920, 1080));
    }

    #[test]
    fn keycodes_are_offset_by_eight() {
        assert_eq!(
            evdev_to_x11_keycode(crate::keyboard::KEY_A).unwrap(),
            38
        );
        assert!(evdev_to_x11_keycode(300).is_err());
    }
}
