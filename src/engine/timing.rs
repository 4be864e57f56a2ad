//! TimingEngine - lookahead click scheduling over a coarse poll timer
//!
//! The engine runs against two clocks. A tokio interval fires every
//! `poll_interval` and decides when the scheduler gets to compute; the
//! audio backend's own clock supplies the timestamps that clicks are
//! scheduled at. On every tick the scheduler dispatches every click whose
//! target time has entered the `schedule_ahead` window, so a tick that
//! fires late under system load still schedules all due clicks at their
//! exact target times and tempo accuracy is preserved. The poll period
//! must never be confused with the beat period.
//!
//! Thread model: all mutable state lives behind one mutex; configuration
//! setters, the tick task, and start/stop all mutate through it. The
//! visual beat callback is dispatched onto its own one-shot task and is
//! best-effort only - it never feeds back into audio timing.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use crate::clock::{AudioClock, ClickTimbre};
use crate::config::{EngineDefaults, SchedulerConfig};
use crate::host::HostNotifier;

/// Tempo clamp lower bound, in beats per minute
pub const MIN_TEMPO_BPM: f64 = 30.0;
/// Tempo clamp upper bound, in beats per minute
pub const MAX_TEMPO_BPM: f64 = 300.0;
/// How long each scheduled click sounds, in seconds
pub const CLICK_LENGTH_SECS: f64 = 0.05;

/// Visual-feedback callback: `(beat_index, is_accent)`.
///
/// Invoked once per dispatched beat, approximately at that beat's audio
/// time. Jitter on the order of the poll interval is expected; the
/// callback must never be used to derive audio timing.
pub type BeatCallback = Arc<dyn Fn(u32, bool) + Send + Sync>;

/// Beats per measure plus the (informational) note value.
///
/// Only `beats` participates in timing math; `note_value` is carried for
/// display purposes. `beats == 0` is a caller error the engine does not
/// re-validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    pub note_value: u32,
}

/// Ordered accent markers, one per beat of the measure.
///
/// Length always equals the current `TimeSignature::beats`; changing the
/// signature resets the pattern to first-beat-accented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccentPattern {
    slots: Vec<bool>,
}

impl AccentPattern {
    /// Default pattern for a measure: beat 0 accented, rest unaccented.
    fn for_beats(beats: u32) -> Self {
        let mut slots = vec![false; beats as usize];
        if let Some(first) = slots.first_mut() {
            *first = true;
        }
        Self { slots }
    }

    /// Whether the given beat index is accented (wraps on pattern length).
    pub fn is_accented(&self, beat: u32) -> bool {
        self.slots[beat as usize % self.slots.len()]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.slots
    }
}

/// Fixed lookahead window for the scheduler loop.
///
/// Both durations are set at engine construction and stay constant for
/// the engine's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleWindow {
    /// How far past "now" clicks may be pre-computed
    pub schedule_ahead: Duration,
    /// How often the scheduler tick fires
    pub poll_interval: Duration,
}

impl ScheduleWindow {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            schedule_ahead: Duration::from_millis(config.schedule_ahead_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Mutable engine state guarded by the one engine mutex.
struct BeatState {
    tempo: f64,
    signature: TimeSignature,
    accents: AccentPattern,
    is_playing: bool,
    current_beat: u32,
    next_note_time: f64,
    on_beat: Option<BeatCallback>,
    /// Bumped on every start so a stale tick task from a previous
    /// playback run exits instead of double-driving the scheduler.
    generation: u64,
}

/// The metronome timing engine.
///
/// Owns tempo/time-signature/accent state and the playback state machine
/// (Idle -> Playing -> Idle), runs the periodic lookahead scheduler, and
/// fires the best-effort visual callback aligned to each click's real
/// playback time. The audio backend and host shell are shared
/// collaborators, never owned exclusively.
pub struct TimingEngine {
    clock: Arc<dyn AudioClock>,
    notifier: Arc<dyn HostNotifier>,
    window: ScheduleWindow,
    state: Arc<Mutex<BeatState>>,
}

impl TimingEngine {
    /// Create an engine in the Idle state.
    ///
    /// # Arguments
    /// * `clock` - audio backend clock and click sink
    /// * `notifier` - host shell receiving start/stop signals
    /// * `defaults` - startup tempo and time signature
    /// * `scheduler` - lookahead window, fixed for the engine's lifetime
    pub fn new(
        clock: Arc<dyn AudioClock>,
        notifier: Arc<dyn HostNotifier>,
        defaults: &EngineDefaults,
        scheduler: &SchedulerConfig,
    ) -> Self {
        let state = BeatState {
            tempo: defaults.tempo.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM),
            signature: TimeSignature {
                beats: defaults.beats,
                note_value: defaults.note_value,
            },
            accents: AccentPattern::for_beats(defaults.beats),
            is_playing: false,
            current_beat: 0,
            next_note_time: 0.0,
            on_beat: None,
            generation: 0,
        };

        Self {
            clock,
            notifier,
            window: ScheduleWindow::from_config(scheduler),
            state: Arc::new(Mutex::new(state)),
        }
    }

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    /// Set the tempo in beats per minute.
    ///
    /// Out-of-range values are clamped to [30, 300], not rejected; there
    /// is no error path. Takes effect from the next undispatched beat.
    pub fn set_tempo(&self, bpm: f64) {
        let mut state = lock_state(&self.state);
        state.tempo = bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
    }

    /// Replace the time signature.
    ///
    /// Unconditionally resets the accent pattern to `beats` entries with
    /// only the first beat accented - any customized pattern is lost and
    /// must be re-applied by the caller. `beats` must be positive; the
    /// engine does not re-validate it.
    pub fn set_time_signature(&self, beats: u32, note_value: u32) {
        let mut state = lock_state(&self.state);
        state.signature = TimeSignature { beats, note_value };
        state.accents = AccentPattern::for_beats(beats);
    }

    /// Install a custom accent pattern.
    ///
    /// Accepted only when `pattern.len()` equals the current beat count;
    /// a mismatched pattern leaves the current one untouched with no
    /// feedback to the caller (forgiving-API contract).
    pub fn set_accent_pattern(&self, pattern: &[bool]) {
        let mut state = lock_state(&self.state);
        if pattern.len() == state.signature.beats as usize {
            state.accents = AccentPattern {
                slots: pattern.to_vec(),
            };
        } else {
            debug!(
                "Accent pattern of length {} rejected (signature has {} beats)",
                pattern.len(),
                state.signature.beats
            );
        }
    }

    /// Register the visual-feedback callback, replacing any previous one.
    pub fn on_beat<F>(&self, callback: F)
    where
        F: Fn(u32, bool) + Send + Sync + 'static,
    {
        let mut state = lock_state(&self.state);
        state.on_beat = Some(Arc::new(callback));
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start playback. No-op when already playing.
    ///
    /// Resumes a suspended audio clock, resets the beat cursor to 0 and
    /// `next_note_time` to the clock's current time, notifies the host,
    /// and spawns the periodic scheduler tick on the ambient tokio
    /// runtime. Without a runtime the engine still enters the Playing
    /// state and can be driven manually via [`tick`](Self::tick).
    pub fn start(&self) {
        let generation = {
            let mut state = lock_state(&self.state);
            if state.is_playing {
                debug!("start ignored: engine already playing");
                return;
            }

            if self.clock.is_suspended() {
                self.clock.resume();
            }

            state.is_playing = true;
            state.current_beat = 0;
            state.next_note_time = self.clock.now();
            state.generation += 1;
            state.generation
        };

        self.notifier.notify_start();
        self.spawn_tick_task(generation);
    }

    /// Stop playback.
    ///
    /// Sets `is_playing` to false (the tick task observes this and exits)
    /// and notifies the host. The beat cursor and `next_note_time` are
    /// deliberately left as-is until the next start; clicks already queued
    /// inside the lookahead window and visual timers already armed are not
    /// retracted and will still fire.
    pub fn stop(&self) {
        {
            let mut state = lock_state(&self.state);
            state.is_playing = false;
        }
        self.notifier.notify_stop();
    }

    /// Run one scheduler pass.
    ///
    /// Dispatches every click whose target time falls inside the lookahead
    /// window, advancing the beat cursor and `next_note_time` for each.
    /// Called by the periodic tick task; public so embedders and tests can
    /// drive the scheduler from their own timer.
    ///
    /// # Returns
    /// Number of clicks dispatched in this pass.
    pub fn tick(&self) -> usize {
        let (dispatched, pending) = {
            let mut state = lock_state(&self.state);
            run_scheduler_pass(&mut state, self.clock.as_ref(), &self.window)
        };
        dispatch_pending(pending);
        dispatched
    }

    fn spawn_tick_task(&self, generation: u64) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime: scheduler tick not spawned, drive tick() manually");
                return;
            }
        };

        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let window = self.window;

        handle.spawn(async move {
            let mut interval = tokio::time::interval(window.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let (_, pending) = {
                    let mut guard = lock_state(&state);
                    if !guard.is_playing || guard.generation != generation {
                        break;
                    }
                    run_scheduler_pass(&mut guard, clock.as_ref(), &window)
                };
                dispatch_pending(pending);
            }
        });
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// Current tempo in beats per minute.
    pub fn tempo(&self) -> f64 {
        lock_state(&self.state).tempo
    }

    /// Current time signature.
    pub fn time_signature(&self) -> TimeSignature {
        lock_state(&self.state).signature
    }

    /// Snapshot of the current accent pattern.
    pub fn accent_pattern(&self) -> AccentPattern {
        lock_state(&self.state).accents.clone()
    }

    /// Whether the engine is in the Playing state.
    pub fn is_playing(&self) -> bool {
        lock_state(&self.state).is_playing
    }

    /// Beat index the next dispatched click will carry.
    pub fn current_beat(&self) -> u32 {
        lock_state(&self.state).current_beat
    }

    /// Clock timestamp at which the next unscheduled beat should sound.
    pub fn next_note_time(&self) -> f64 {
        lock_state(&self.state).next_note_time
    }

    /// The fixed lookahead window this engine was built with.
    pub fn schedule_window(&self) -> ScheduleWindow {
        self.window
    }
}

/// Lock the shared state, recovering from poisoning.
///
/// Nothing runs user code while holding this lock (beat callbacks are
/// collected during the pass and only dispatched after the guard drops),
/// so a poisoned mutex can only come from an internal panic; the inner
/// state is still the most recent one.
fn lock_state<'a>(state: &'a Mutex<BeatState>) -> MutexGuard<'a, BeatState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            debug!("engine state mutex poisoned; continuing with inner value");
            poisoned.into_inner()
        }
    }
}

/// A visual-callback invocation collected during a scheduler pass.
///
/// Callbacks are never invoked while the state lock is held; each pass
/// collects these and the caller dispatches them after the guard drops,
/// so a callback that re-enters the engine cannot deadlock and a slow
/// callback cannot stall audio scheduling.
struct PendingBeat {
    callback: BeatCallback,
    beat: u32,
    is_accent: bool,
    delay: Duration,
}

/// The scheduler loop body.
///
/// While playing and `next_note_time` is inside the lookahead window,
/// dispatch the click for the current beat at its absolute target time,
/// then advance `next_note_time` by `60 / tempo` (tempo re-read each
/// advance so changes apply from the next undispatched beat) and wrap the
/// beat cursor on the measure length. Target times come from the audio
/// clock alone, so a late-firing tick catches up without drifting.
///
/// # Returns
/// The number of clicks dispatched and the visual callbacks to invoke
/// once the state lock is released.
fn run_scheduler_pass(
    state: &mut BeatState,
    clock: &dyn AudioClock,
    window: &ScheduleWindow,
) -> (usize, Vec<PendingBeat>) {
    let ahead = window.schedule_ahead.as_secs_f64();
    let mut dispatched = 0;
    let mut pending = Vec::new();

    while state.is_playing && state.next_note_time < clock.now() + ahead {
        if let Some(beat) = dispatch_click(state, clock) {
            pending.push(beat);
        }

        let seconds_per_beat = 60.0 / state.tempo;
        state.next_note_time += seconds_per_beat;
        state.current_beat = (state.current_beat + 1) % state.signature.beats;

        dispatched += 1;
    }

    (dispatched, pending)
}

/// Dispatch the click for the current beat at `next_note_time`.
///
/// The click itself goes to the backend's sample-accurate scheduler; the
/// visual callback, if registered, is handed back for deferred dispatch
/// outside the state lock.
fn dispatch_click(state: &BeatState, clock: &dyn AudioClock) -> Option<PendingBeat> {
    let beat = state.current_beat;
    let time = state.next_note_time;
    let is_accent = state.accents.is_accented(beat);

    let timbre = if is_accent {
        ClickTimbre::Accent
    } else {
        ClickTimbre::Beat
    };
    clock.schedule_click(timbre, time, time + CLICK_LENGTH_SECS);

    state.on_beat.as_ref().map(|callback| PendingBeat {
        callback: Arc::clone(callback),
        beat,
        is_accent,
        delay: Duration::from_secs_f64((time - clock.now()).max(0.0)),
    })
}

/// Arm every callback collected by a scheduler pass.
fn dispatch_pending(pending: Vec<PendingBeat>) {
    for beat in pending {
        defer_beat_callback(beat.callback, beat.beat, beat.is_accent, beat.delay);
    }
}

/// Arm a one-shot deferred invocation of the visual callback.
///
/// The callback runs on its own task and behind `catch_unwind`, so a
/// panicking callback can never stop audio scheduling. Without an ambient
/// runtime the callback fires inline, still isolated.
fn defer_beat_callback(callback: BeatCallback, beat: u32, is_accent: bool, delay: Duration) {
    let invoke = move || {
        if catch_unwind(AssertUnwindSafe(|| callback(beat, is_accent))).is_err() {
            warn!("Beat callback panicked for beat {}", beat);
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                invoke();
            });
        }
        Err(_) => invoke(),
    }
}
