//! HostNotifier - start/stop signals for the process shell
//!
//! When playback is running, the host process is expected to hold a
//! system-sleep-prevention lock so the OS does not suspend the app
//! mid-measure. The engine only emits one-way start/stop signals; the
//! host side must be idempotent because the engine does not track
//! host-side state.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

/// One-way playback notifications consumed by the host shell.
pub trait HostNotifier: Send + Sync {
    /// Playback started; the host should begin preventing system sleep.
    fn notify_start(&self);

    /// Playback stopped; the host may allow system sleep again.
    fn notify_stop(&self);
}

/// Host-side sleep-prevention hold with a double-start/double-stop guard.
///
/// Tracks whether a hold is active so repeated start (or stop) signals
/// collapse into one transition, as the notifier contract requires.
/// Acquiring the actual OS assertion is the embedding shell's job; this
/// type supplies the guard and the transition logging.
pub struct SleepBlocker {
    active: AtomicBool,
}

impl SleepBlocker {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Whether a sleep-prevention hold is currently active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for SleepBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl HostNotifier for SleepBlocker {
    fn notify_start(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            info!("Playback started, preventing system sleep");
        } else {
            debug!("Duplicate start notification ignored (hold already active)");
        }
    }

    fn notify_stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Playback stopped, allowing system sleep");
        } else {
            debug!("Duplicate stop notification ignored (no active hold)");
        }
    }
}

/// Notifier for embedders that manage power state themselves.
pub struct NullNotifier;

impl HostNotifier for NullNotifier {
    fn notify_start(&self) {}
    fn notify_stop(&self) {}
}
