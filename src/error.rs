// Error types for the clicktrack engine
//
// This module defines the error type for audio backend operations,
// providing structured error handling with error codes suitable for
// embedding hosts.
//
// The timing engine itself has no recoverable-error taxonomy: tempo is
// clamped, mismatched accent patterns are silently rejected, start/stop
// cannot fail. The only observable failure mode is an unavailable or
// failing audio backend, which is fatal at initialization time.

use log::error;
use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// embedding boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Log an audio error with structured context
///
/// Logs the error code, component, and message along with the call site
/// context. Non-blocking and will not panic.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioBackend, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio backend errors
///
/// These cover output-device discovery, stream creation, and stream
/// lifecycle. All of them are fatal for click playback: without a working
/// output stream no click event can ever be produced.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No default output device is available
    NoOutputDevice,

    /// The device's sample format is not supported (only f32 is handled)
    UnsupportedFormat { format: String },

    /// Failed to open the output stream
    StreamOpenFailed { reason: String },

    /// Hardware error while starting or pausing the stream
    HardwareError { details: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::NoOutputDevice => 1001,
            AudioError::UnsupportedFormat { .. } => 1002,
            AudioError::StreamOpenFailed { .. } => 1003,
            AudioError::HardwareError { .. } => 1004,
            AudioError::LockPoisoned { .. } => 1005,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::NoOutputDevice => "No default output device found".to_string(),
            AudioError::UnsupportedFormat { format } => {
                format!(
                    "Unsupported sample format: {} (only f32 is supported)",
                    format
                )
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

/// Convert from std::io::Error to AudioError
impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(AudioError::NoOutputDevice.code(), 1001);
        assert_eq!(
            AudioError::UnsupportedFormat {
                format: "i16".to_string()
            }
            .code(),
            1002
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            1003
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            1004
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            1005
        );
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::NoOutputDevice;
        assert!(err.message().contains("output device"));

        let err = AudioError::UnsupportedFormat {
            format: "u8".to_string(),
        };
        assert!(err.message().contains("u8"));

        let err = AudioError::LockPoisoned {
            component: "click_queue".to_string(),
        };
        assert!(err.message().contains("click_queue"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test error");
        let audio_err: AudioError = io_err.into();

        match audio_err {
            AudioError::HardwareError { details } => {
                assert!(details.contains("test error"));
            }
            _ => panic!("Expected HardwareError variant"),
        }
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), AudioError> {
            Err(AudioError::NoOutputDevice)
        }

        fn caller() -> Result<(), AudioError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
