//! Configuration management for engine and click parameters
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling tuning without recompilation. Startup tempo, the scheduler
//! window, and the click voices can all be adjusted via the config file.
//!
//! The scheduler window values become process-wide constants once the
//! engine is constructed; they are not mutable at runtime.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub engine: EngineDefaults,
    pub scheduler: SchedulerConfig,
    pub click: ClickConfig,
}

/// Startup tempo and time signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDefaults {
    /// Initial tempo in beats per minute
    pub tempo: f64,
    /// Beats per measure
    pub beats: u32,
    /// Note value of the signature denominator (informational)
    pub note_value: u32,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            beats: 4,
            note_value: 4,
        }
    }
}

/// Lookahead scheduler window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How far past "now" the scheduler may pre-compute clicks, in ms
    pub schedule_ahead_ms: u64,
    /// How often the scheduler loop runs, in ms
    pub poll_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            // 100ms of lookahead absorbs tick jitter well beyond what a
            // loaded desktop scheduler produces at a 25ms poll period
            schedule_ahead_ms: 100,
            poll_interval_ms: 25,
        }
    }
}

/// Click voice synthesis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickConfig {
    /// Oscillator frequency for accented beats, in Hz
    pub accent_freq_hz: f32,
    /// Gain for accented beats
    pub accent_gain: f32,
    /// Oscillator frequency for regular beats, in Hz
    pub beat_freq_hz: f32,
    /// Gain for regular beats
    pub beat_gain: f32,
    /// Click duration in milliseconds
    pub duration_ms: f32,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            accent_freq_hz: 1000.0,
            accent_gain: 0.5,
            beat_freq_hz: 800.0,
            beat_gain: 0.3,
            duration_ms: 50.0,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            engine: EngineDefaults::default(),
            scheduler: SchedulerConfig::default(),
            click: ClickConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file is missing or
    /// the JSON is invalid (a warning is logged in either case).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.tempo, 120.0);
        assert_eq!(config.engine.beats, 4);
        assert_eq!(config.scheduler.schedule_ahead_ms, 100);
        assert_eq!(config.scheduler.poll_interval_ms, 25);
        assert_eq!(config.click.accent_freq_hz, 1000.0);
        assert_eq!(config.click.beat_freq_hz, 800.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/clicktrack.json");
        assert_eq!(config.engine.tempo, 120.0);
        assert_eq!(config.scheduler.poll_interval_ms, 25);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.engine.tempo, config.engine.tempo);
        assert_eq!(
            parsed.scheduler.schedule_ahead_ms,
            config.scheduler.schedule_ahead_ms
        );
        assert_eq!(parsed.click.duration_ms, config.click.duration_ms);
    }
}
