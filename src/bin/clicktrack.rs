//! Command-line metronome
//!
//! Opens the default audio output, starts the timing engine, and prints a
//! beat indicator until the requested duration elapses or Ctrl-C arrives.
//!
//! Examples:
//!   clicktrack --tempo 90
//!   clicktrack --tempo 140 --beats 3
//!   clicktrack --tempo 120 --beats 4 --accents 1,0,1,0 --duration-secs 30

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use clicktrack::audio::CpalClock;
use clicktrack::config::AppConfig;
use clicktrack::{SleepBlocker, TimingEngine};

#[derive(Parser, Debug)]
#[command(name = "clicktrack", about = "Desktop metronome with lookahead click scheduling")]
struct Args {
    /// Tempo in beats per minute (clamped to 30-300)
    #[arg(long, default_value_t = 120.0)]
    tempo: f64,

    /// Beats per measure
    #[arg(long, default_value_t = 4)]
    beats: u32,

    /// Note value of the signature denominator (display only)
    #[arg(long, default_value_t = 4)]
    note_value: u32,

    /// Accent pattern as comma-separated 1/0 markers, e.g. "1,0,1,0".
    /// Must match --beats; a mismatched pattern is ignored.
    #[arg(long)]
    accents: Option<String>,

    /// How long to run, in seconds (0 = until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Path to a JSON config file for scheduler and click parameters
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_accents(spec: &str) -> Result<Vec<bool>> {
    spec.split(',')
        .map(|marker| -> Result<bool> {
            match marker.trim() {
                "1" => Ok(true),
                "0" => Ok(false),
                other => bail!("invalid accent marker {:?} (expected 1 or 0)", other),
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    clicktrack::init_logging();
    let args = Args::parse();

    if args.beats == 0 {
        bail!("--beats must be positive");
    }

    let config = args
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();

    let clock = Arc::new(CpalClock::open(&config.click).context("failed to open audio output")?);
    let notifier = Arc::new(SleepBlocker::new());
    let engine = TimingEngine::new(clock, notifier, &config.engine, &config.scheduler);

    engine.set_tempo(args.tempo);
    engine.set_time_signature(args.beats, args.note_value);
    if let Some(spec) = &args.accents {
        engine.set_accent_pattern(&parse_accents(spec)?);
    }

    let beats = args.beats;
    engine.on_beat(move |beat, accent| {
        let marker = if accent { "●" } else { "○" };
        println!("{} beat {}/{}", marker, beat + 1, beats);
    });

    println!(
        "Playing {:.0} BPM in {}/{} (Ctrl-C to stop)",
        engine.tempo(),
        args.beats,
        args.note_value
    );
    engine.start();

    if args.duration_secs > 0 {
        tokio::time::sleep(Duration::from_secs(args.duration_secs)).await;
    } else {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
    }

    engine.stop();
    println!("Stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accents_valid() {
        assert_eq!(
            parse_accents("1,0,1,0").unwrap(),
            vec![true, false, true, false]
        );
        assert_eq!(parse_accents(" 1 , 0 ").unwrap(), vec![true, false]);
    }

    #[test]
    fn test_parse_accents_rejects_garbage() {
        assert!(parse_accents("1,2,0").is_err());
        assert!(parse_accents("yes,no").is_err());
    }
}
