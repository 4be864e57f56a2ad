//! Deterministic collaborators for tests and dry runs
//!
//! Real click scheduling depends on an audio device and wall-clock time,
//! neither of which belongs in a unit test. This module provides a
//! hand-advanced [`ManualClock`] that records every scheduled click and a
//! [`CountingNotifier`] that counts host signals, so scheduler behavior
//! can be asserted exactly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::clock::{AudioClock, ClickTimbre};
use crate::host::HostNotifier;

/// A click captured by [`ManualClock::schedule_click`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedClick {
    pub timbre: ClickTimbre,
    pub start: f64,
    pub stop: f64,
}

/// Hand-advanced audio clock that records scheduled clicks.
///
/// Time only moves when a test calls [`advance`](Self::advance), which
/// makes every scheduler pass fully deterministic.
pub struct ManualClock {
    now: Mutex<f64>,
    suspended: AtomicBool,
    resumes: AtomicU64,
    clicks: Mutex<Vec<RecordedClick>>,
}

impl ManualClock {
    /// Create a running clock at t = 0.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(0.0),
            suspended: AtomicBool::new(false),
            resumes: AtomicU64::new(0),
            clicks: Mutex::new(Vec::new()),
        }
    }

    /// Create a clock in the suspended state, as a fresh audio backend
    /// reports before playback first starts.
    pub fn suspended() -> Self {
        let clock = Self::new();
        clock.suspended.store(true, Ordering::SeqCst);
        clock
    }

    /// Move time forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        let mut now = self.now.lock().expect("manual clock time lock");
        *now += seconds;
    }

    /// Snapshot of every click scheduled so far, in dispatch order.
    pub fn clicks(&self) -> Vec<RecordedClick> {
        self.clicks.lock().expect("manual clock click log").clone()
    }

    /// How many times `resume()` has been called.
    pub fn resume_count(&self) -> u64 {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().expect("manual clock time lock")
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn schedule_click(&self, timbre: ClickTimbre, start: f64, stop: f64) {
        self.clicks
            .lock()
            .expect("manual clock click log")
            .push(RecordedClick {
                timbre,
                start,
                stop,
            });
    }
}

/// Host notifier that counts start/stop signals.
pub struct CountingNotifier {
    starts: AtomicU64,
    stops: AtomicU64,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self {
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for CountingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HostNotifier for CountingNotifier {
    fn notify_start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_monotonically() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
        clock.advance(0.25);
        clock.advance(0.25);
        assert_eq!(clock.now(), 0.5);
    }

    #[test]
    fn test_manual_clock_records_clicks_in_order() {
        let clock = ManualClock::new();
        clock.schedule_click(ClickTimbre::Accent, 0.0, 0.05);
        clock.schedule_click(ClickTimbre::Beat, 0.5, 0.55);

        let clicks = clock.clicks();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].timbre, ClickTimbre::Accent);
        assert_eq!(clicks[1].start, 0.5);
    }

    #[test]
    fn test_suspended_clock_resume() {
        let clock = ManualClock::suspended();
        assert!(clock.is_suspended());
        clock.resume();
        assert!(!clock.is_suspended());
        assert_eq!(clock.resume_count(), 1);
    }

    #[test]
    fn test_counting_notifier() {
        let notifier = CountingNotifier::new();
        notifier.notify_start();
        notifier.notify_start();
        notifier.notify_stop();
        assert_eq!(notifier.starts(), 2);
        assert_eq!(notifier.stops(), 1);
    }
}
