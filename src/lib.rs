// Clicktrack - metronome timing engine with lookahead click scheduling

// Module declarations
pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod testing;

// Re-exports for convenience
pub use clock::{AudioClock, ClickTimbre};
pub use engine::TimingEngine;
pub use host::{HostNotifier, NullNotifier, SleepBlocker};

use tracing_subscriber::EnvFilter;

/// Initialize logging for binaries and embedding hosts.
///
/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// `log` records from the library are captured through the tracing
/// bridge. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
