//! AudioClock - the timing engine's view of the audio backend
//!
//! The engine deliberately runs against two clocks: a coarse polling timer
//! that decides *when to compute*, and the backend's own high-resolution
//! clock that supplies *what time to schedule*. This trait is the seam for
//! the second one. Implementations must keep `now()` monotonically
//! increasing and must honor absolute start times with sample accuracy;
//! the polling timer is never an acceptable substitute.

/// Which click voice to render for a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTimbre {
    /// Emphasized beat (higher pitch, louder)
    Accent,
    /// Regular beat
    Beat,
}

/// Monotonic, high-resolution time source plus a sound-emission primitive.
///
/// Contract:
/// - `now()` returns seconds since an arbitrary epoch and never decreases.
/// - `schedule_click` is fire-and-forget: the backend renders the click
///   starting exactly at `start` and silences it at `stop`, on its own
///   sample clock. The call itself must be non-blocking. A `start` that is
///   already in the past begins playback immediately rather than failing.
/// - A suspended backend does not advance `now()`; `resume()` brings it
///   back to the running state. The engine resumes a suspended clock only
///   when playback starts.
pub trait AudioClock: Send + Sync {
    /// Current backend time in seconds.
    fn now(&self) -> f64;

    /// Whether the backend is currently suspended.
    fn is_suspended(&self) -> bool;

    /// Resume a suspended backend. No-op when already running.
    fn resume(&self);

    /// Schedule a click of the given timbre at absolute backend time
    /// `start`, stopping at `stop` (both in seconds on this clock).
    fn schedule_click(&self, timbre: ClickTimbre, start: f64, stop: f64);
}
