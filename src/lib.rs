pub mod keyboard;
pub mod keymap;
pub mod model;
pub mod playback;

#[cfg(feature = "wayland")]
pub mod protocols;
pub mod sim;
pub mod snippet;
pub mod trace;
pub mod typist;
