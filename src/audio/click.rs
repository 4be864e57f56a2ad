//! Click synthesis - pre-rendered oscillator bursts
//!
//! Both metronome voices are short sine bursts: 1000 Hz at gain 0.5 for
//! accented beats and 800 Hz at gain 0.3 for regular beats by default,
//! 50 ms long. The tables are rendered once at backend startup so the
//! audio callback only copies samples and never computes a sine.

use crate::clock::ClickTimbre;
use crate::config::ClickConfig;

/// Render a sine click into a sample buffer.
///
/// # Arguments
/// * `freq_hz` - oscillator frequency
/// * `gain` - linear amplitude
/// * `duration_ms` - burst length in milliseconds
/// * `sample_rate` - output sample rate in Hz
///
/// # Returns
/// Samples in `[-gain, gain]`, exactly `duration_ms` worth at the given
/// sample rate.
pub fn render_click(freq_hz: f32, gain: f32, duration_ms: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_ms / 1000.0) as usize;
    let step = std::f32::consts::TAU * freq_hz / sample_rate as f32;

    (0..num_samples)
        .map(|i| (step * i as f32).sin() * gain)
        .collect()
}

/// Convert seconds on the audio clock to a frame index.
///
/// Negative times clamp to frame 0; a click whose start is already in the
/// past begins immediately rather than being dropped.
pub fn secs_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

/// Pre-rendered sample tables for both click voices.
pub struct ClickTables {
    accent: Vec<f32>,
    beat: Vec<f32>,
}

impl ClickTables {
    /// Render both voices at the given sample rate.
    pub fn render(config: &ClickConfig, sample_rate: u32) -> Self {
        Self {
            accent: render_click(
                config.accent_freq_hz,
                config.accent_gain,
                config.duration_ms,
                sample_rate,
            ),
            beat: render_click(
                config.beat_freq_hz,
                config.beat_gain,
                config.duration_ms,
                sample_rate,
            ),
        }
    }

    /// Sample table for the given timbre.
    pub fn table(&self, timbre: ClickTimbre) -> &[f32] {
        match timbre {
            ClickTimbre::Accent => &self.accent,
            ClickTimbre::Beat => &self.beat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_click_duration() {
        let sample_rates = [44100, 48000, 96000];

        for &sr in &sample_rates {
            let click = render_click(1000.0, 0.5, 50.0, sr);
            let expected = (sr as f32 * 0.05) as usize;
            assert_eq!(
                click.len(),
                expected,
                "click should be exactly 50ms at {} Hz",
                sr
            );
        }
    }

    #[test]
    fn test_render_click_respects_gain() {
        let click = render_click(800.0, 0.3, 50.0, 48000);

        for (i, &sample) in click.iter().enumerate() {
            assert!(
                sample.abs() <= 0.3 + f32::EPSILON,
                "sample {} at index {} exceeds gain 0.3",
                sample,
                i
            );
        }

        // A sine burst at 800Hz over 50ms reaches near its peak amplitude
        let peak = click.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.29, "peak {} should approach the gain", peak);
    }

    #[test]
    fn test_render_click_starts_at_zero_crossing() {
        let click = render_click(1000.0, 0.5, 50.0, 48000);
        assert_eq!(click[0], 0.0, "sine burst starts at a zero crossing");
    }

    #[test]
    fn test_secs_to_frames_rounds() {
        assert_eq!(secs_to_frames(0.0, 48000), 0);
        assert_eq!(secs_to_frames(1.0, 48000), 48000);
        assert_eq!(secs_to_frames(0.5, 44100), 22050);
        // Rounds to the nearest frame rather than truncating
        assert_eq!(secs_to_frames(1.0 / 48000.0 * 0.6, 48000), 1);
    }

    #[test]
    fn test_secs_to_frames_clamps_past_times() {
        assert_eq!(
            secs_to_frames(-0.25, 48000),
            0,
            "a start time in the past plays immediately"
        );
    }

    #[test]
    fn test_click_tables_voice_parameters() {
        let tables = ClickTables::render(&ClickConfig::default(), 48000);

        let accent = tables.table(ClickTimbre::Accent);
        let beat = tables.table(ClickTimbre::Beat);
        assert_eq!(accent.len(), beat.len());

        let accent_peak = accent.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let beat_peak = beat.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(
            accent_peak > beat_peak,
            "accented voice ({}) must be louder than the regular voice ({})",
            accent_peak,
            beat_peak
        );
    }
}
