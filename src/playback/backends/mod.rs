#[cfg(feature = "wayland")]
pub mod wayland;

#[cfg(feature = "x11")]
pub mod x11;

// Modifiers released on abort/error and before an X11 run starts.
// Releases are sent even if the key is not down.
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    crate::keyboard::KEY_LEFTSHIFT,
    crate::keyboard::KEY_RIGHTSHIFT,
    crate::keyboard::KEY_LEFTCTRL,
    crate::keyboard::KEY_RIGHTCTRL,
    crate::keyboard::KEY_LEFTALT,
    crate::keyboard::KEY_RIGHTALT,
];

#[cfg(test)]
mod tests {
    use super::COMMON_MODIFIER_KEYCODES;

    #[test]
    fn releases_the_shift_used_for_typing() {
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_LEFTSHIFT));
    }
}
