use std::ffi::OsString;
use std::sync::{Mutex, OnceLock};

use codetyper::playback::{preflight_backend, resolve_backend, PlaybackBackend};

const SESSION_VARS: [&str; 4] = ["WAYLAND_DISPLAY", "WAYLAND_SOCKET", "DISPLAY", "XDG_SESSION_TYPE"];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

struct EnvRestore(Vec<(&'static str, Option<OsString>)>);

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (name, value) in &self.0 {
            // SAFETY: env mutations are serialized by `env_lock()`.
            match value {
                Some(v) => unsafe { std::env::set_var(name, v) },
                None => unsafe { std::env::remove_var(name) },
            }
        }
    }
}

/// Run `f` with exactly the given display-session variables set.
fn with_session<T>(set: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    let _restore = EnvRestore(
        SESSION_VARS
            .iter()
            .map(|name| (*name, std::env::var_os(name)))
            .collect(),
    );

    for name in SESSION_VARS {
        // SAFETY: callers hold the global test mutex from `env_lock()`.
        unsafe { std::env::remove_var(name) };
    }
    for (name, value) in set {
        // SAFETY: as above.
        unsafe { std::env::set_var(name, value) };
    }

    f()
}

#[test]
fn auto_prefers_wayland_when_both_present() {
    let result = with_session(&[("WAYLAND_DISPLAY", "wayland-1"), ("DISPLAY", ":0")], || {
        resolve_backend(PlaybackBackend::Auto)
    });

    #[cfg(feature = "wayland")]
    {
        assert_eq!(result.expect("should resolve"), PlaybackBackend::Wayland);
    }

    #[cfg(all(not(feature = "wayland"), feature = "x11"))]
    {
        assert_eq!(result.expect("should resolve"), PlaybackBackend::X11);
    }

    #[cfg(all(not(feature = "wayland"), not(feature = "x11")))]
    {
        assert!(format!("{:#}", result.unwrap_err()).contains("disabled"));
    }
}

#[test]
fn auto_resolves_x11_from_display_only() {
    let result = with_session(&[("DISPLAY", ":0")], || resolve_backend(PlaybackBackend::Auto));

    #[cfg(feature = "x11")]
    {
        assert_eq!(result.expect("should resolve"), PlaybackBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("DISPLAY is set"), "got: {msg}");
    }
}

#[test]
fn auto_without_any_session_is_an_error() {
    let err = with_session(&[], || resolve_backend(PlaybackBackend::Auto)).unwrap_err();
    let msg = format!("{err:#}");
    assert!(
        msg.contains("No supported playback backend detected"),
        "got: {msg}"
    );
    assert!(msg.contains("No display session detected"), "got: {msg}");
}

#[test]
fn explicit_x11_is_accepted_without_session_vars() {
    let result = with_session(&[], || resolve_backend(PlaybackBackend::X11));

    #[cfg(feature = "x11")]
    {
        assert_eq!(result.expect("should resolve"), PlaybackBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("X11") && msg.contains("disabled"), "got: {msg}");
    }
}

#[test]
fn seat_is_rejected_when_blank_or_on_x11() {
    let err = with_session(&[], || {
        preflight_backend(PlaybackBackend::Wayland, Some("  "))
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("--seat must not be empty"));

    #[cfg(feature = "x11")]
    {
        let err = with_session(&[("DISPLAY", ":0")], || {
            preflight_backend(PlaybackBackend::X11, Some("seat0"))
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("Wayland-only"));
    }
}
