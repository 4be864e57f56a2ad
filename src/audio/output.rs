//! CpalClock - cpal-backed audio clock and click sink
//!
//! This is the production [`AudioClock`]: a cpal output stream whose
//! callback mixes pre-rendered click tables into the output buffer.
//! Key properties:
//! - Time comes from an atomic frame counter advanced by the callback;
//!   `now() = frames / sample_rate`, monotonic and sample-accurate.
//! - Clicks travel to the callback over a lock-free SPSC queue; the
//!   callback performs no allocation, locking, or blocking.
//! - The `cpal::Stream` is not `Send`, so a dedicated audio thread owns
//!   it and reacts to resume/shutdown commands from the handle.
//!
//! The stream opens paused: a fresh backend reports suspended until the
//! engine resumes it on the first start, which mirrors how desktop audio
//! sessions stay idle until playback actually begins.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};

use super::click::{secs_to_frames, ClickTables};
use crate::clock::{AudioClock, ClickTimbre};
use crate::config::ClickConfig;
use crate::error::{log_audio_error, AudioError};

/// Capacity of the click queue between engine and audio callback.
///
/// The lookahead window holds at most a handful of undecayed clicks even
/// at 300 BPM; 64 leaves a wide margin before clicks get dropped.
const CLICK_QUEUE_CAPACITY: usize = 64;

/// Maximum clicks simultaneously admitted into the mixer.
const MAX_ACTIVE_CLICKS: usize = 8;

/// A click in flight between the engine and the audio callback.
#[derive(Debug, Clone, Copy)]
struct ScheduledClick {
    timbre: ClickTimbre,
    start_frame: u64,
    stop_frame: u64,
}

/// A click admitted into the mixer's voice pool.
#[derive(Debug, Clone, Copy)]
struct ActiveClick {
    timbre: ClickTimbre,
    start_frame: u64,
    stop_frame: u64,
}

/// Control messages for the stream-owning audio thread.
enum StreamCommand {
    Resume,
    Shutdown,
}

/// Handle to the cpal output backend.
///
/// Cheap to share behind an `Arc`; dropping the handle shuts the audio
/// thread down.
pub struct CpalClock {
    frames: Arc<AtomicU64>,
    suspended: Arc<AtomicBool>,
    sample_rate: u32,
    producer: Mutex<rtrb::Producer<ScheduledClick>>,
    commands: mpsc::Sender<StreamCommand>,
}

impl CpalClock {
    /// Open the default output device and spawn the audio thread.
    ///
    /// # Arguments
    /// * `config` - click voice parameters; tables are rendered at the
    ///   device's sample rate
    ///
    /// # Errors
    /// Fatal if no output device exists, the device's format is not f32,
    /// or the stream cannot be opened - without a stream no click can
    /// ever sound.
    pub fn open(config: &ClickConfig) -> Result<Self, AudioError> {
        let frames = Arc::new(AtomicU64::new(0));
        let suspended = Arc::new(AtomicBool::new(true));
        let (producer, consumer) = rtrb::RingBuffer::new(CLICK_QUEUE_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let click_config = config.clone();
        let thread_frames = Arc::clone(&frames);
        let thread_suspended = Arc::clone(&suspended);

        std::thread::Builder::new()
            .name("clicktrack-audio".to_string())
            .spawn(move || {
                audio_thread(
                    click_config,
                    consumer,
                    thread_frames,
                    thread_suspended,
                    command_rx,
                    ready_tx,
                );
            })
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to spawn audio thread: {}", e),
            })?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(err)) => {
                log_audio_error(&err, "open");
                return Err(err);
            }
            Err(_) => {
                let err = AudioError::HardwareError {
                    details: "Audio thread exited before initialization".to_string(),
                };
                log_audio_error(&err, "open");
                return Err(err);
            }
        };

        info!("Audio output opened at {} Hz", sample_rate);

        Ok(Self {
            frames,
            suspended,
            sample_rate,
            producer: Mutex::new(producer),
            commands: command_tx,
        })
    }

    /// Sample rate of the opened output stream, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioClock for CpalClock {
    fn now(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    fn resume(&self) {
        if self.suspended.swap(false, Ordering::SeqCst)
            && self.commands.send(StreamCommand::Resume).is_err()
        {
            let err = AudioError::HardwareError {
                details: "Audio thread terminated".to_string(),
            };
            log_audio_error(&err, "resume");
        }
    }

    fn schedule_click(&self, timbre: ClickTimbre, start: f64, stop: f64) {
        let click = ScheduledClick {
            timbre,
            start_frame: secs_to_frames(start, self.sample_rate),
            stop_frame: secs_to_frames(stop, self.sample_rate),
        };

        match self.producer.lock() {
            Ok(mut producer) => {
                // Fire-and-forget contract: a full queue drops the click
                if producer.push(click).is_err() {
                    warn!("Click queue full; dropping click at t={:.3}", start);
                }
            }
            Err(_) => {
                let err = AudioError::LockPoisoned {
                    component: "click_queue".to_string(),
                };
                log_audio_error(&err, "schedule_click");
            }
        }
    }
}

impl Drop for CpalClock {
    fn drop(&mut self) {
        let _ = self.commands.send(StreamCommand::Shutdown);
    }
}

/// Body of the stream-owning thread.
///
/// Builds the output stream, reports readiness (or the fatal error) back
/// to the opener, then services resume/shutdown commands until the handle
/// is dropped.
fn audio_thread(
    config: ClickConfig,
    consumer: rtrb::Consumer<ScheduledClick>,
    frames: Arc<AtomicU64>,
    suspended: Arc<AtomicBool>,
    command_rx: mpsc::Receiver<StreamCommand>,
    ready_tx: mpsc::Sender<Result<u32, AudioError>>,
) {
    let (stream, sample_rate) = match open_output_stream(&config, consumer, frames) {
        Ok(opened) => opened,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    // Establish the suspended state; some hosts start streams running
    if let Err(e) = stream.pause() {
        warn!("Output stream could not be paused, starting in running state: {}", e);
        suspended.store(false, Ordering::SeqCst);
    }

    if ready_tx.send(Ok(sample_rate)).is_err() {
        return;
    }

    while let Ok(command) = command_rx.recv() {
        match command {
            StreamCommand::Resume => {
                if let Err(e) = stream.play() {
                    let err = AudioError::HardwareError {
                        details: format!("Failed to start output stream: {}", e),
                    };
                    log_audio_error(&err, "audio_thread");
                }
            }
            StreamCommand::Shutdown => break,
        }
    }

    drop(stream);
}

/// Build the cpal output stream with the click-mixing callback.
fn open_output_stream(
    config: &ClickConfig,
    mut consumer: rtrb::Consumer<ScheduledClick>,
    frames: Arc<AtomicU64>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;

    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::UnsupportedFormat {
            format: format!("{:?}", supported.sample_format()),
        });
    }

    let stream_config: cpal::StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;
    let tables = ClickTables::render(config, sample_rate);
    let mut voices: [Option<ActiveClick>; MAX_ACTIVE_CLICKS] = [None; MAX_ACTIVE_CLICKS];

    let err_fn = |err| log::error!("Output stream error: {}", err);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let first_frame = frames.load(Ordering::Relaxed);
                admit_due_clicks(&mut consumer, &mut voices, first_frame);
                mix_clicks(data, channels, first_frame, &mut voices, &tables);
                frames.fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

    Ok((stream, sample_rate))
}

/// Move queued clicks into free voice slots.
///
/// Clicks whose start frame has already passed begin at the current frame
/// instead, preserving their full burst length - a late click plays
/// immediately, it is never dropped.
fn admit_due_clicks(
    consumer: &mut rtrb::Consumer<ScheduledClick>,
    voices: &mut [Option<ActiveClick>; MAX_ACTIVE_CLICKS],
    first_frame: u64,
) {
    for slot in voices.iter_mut() {
        if slot.is_some() {
            continue;
        }
        match consumer.pop() {
            Ok(click) => {
                let length = click.stop_frame.saturating_sub(click.start_frame);
                let start_frame = click.start_frame.max(first_frame);
                *slot = Some(ActiveClick {
                    timbre: click.timbre,
                    start_frame,
                    stop_frame: start_frame + length,
                });
            }
            Err(_) => break,
        }
    }
}

/// Mix active clicks into the interleaved output buffer.
///
/// Finished voices are cleared as their stop frame passes. All channels
/// receive the same mono click signal.
fn mix_clicks(
    data: &mut [f32],
    channels: usize,
    first_frame: u64,
    voices: &mut [Option<ActiveClick>; MAX_ACTIVE_CLICKS],
    tables: &ClickTables,
) {
    let frame_count = data.len() / channels;

    for i in 0..frame_count {
        let frame = first_frame + i as u64;
        let mut sample = 0.0f32;

        for voice in voices.iter_mut() {
            let Some(click) = *voice else { continue };

            if frame >= click.stop_frame {
                *voice = None;
                continue;
            }
            if frame < click.start_frame {
                continue;
            }

            let offset = (frame - click.start_frame) as usize;
            let table = tables.table(click.timbre);
            if offset < table.len() {
                sample += table[offset];
            }
        }

        for ch in 0..channels {
            data[i * channels + ch] = sample;
        }
    }
}
