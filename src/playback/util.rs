use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::playback::sink::{AbortCause, PlaybackError};

pub(crate) fn sleep_interruptible(stop: &AtomicBool, ms: u64) {
    let mut remaining = ms;
    while remaining > 0 {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let step = remaining.min(50);
        std::thread::sleep(Duration::from_millis(step));
        remaining -= step;
    }
}

/// Flag set by Ctrl+C / SIGTERM. Can only be installed once per process.
pub(crate) fn install_stop_handler() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;
    Ok(stop)
}

pub(crate) fn countdown(stop: &AtomicBool, secs: u64) -> Result<()> {
    if secs == 0 {
        return Ok(());
    }

    eprintln!("Focus the target editor window. Starting in {secs}s...");
    eprintln!("Press Ctrl+C to stop.");
    eprintln!("Once typing starts on X11, moving the pointer into a screen corner also stops it.");
    for remaining in (1..=secs).rev() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        eprintln!("{remaining}...");
        sleep_interruptible(stop, 1000);
    }

    if stop.load(Ordering::SeqCst) {
        return Err(PlaybackError::Aborted(AbortCause::Interrupted).into());
    }
    Ok(())
}
