use thiserror::Error;

/// Main error type for the rhythm-mapper library
#[derive(Error, Debug)]
pub enum RhythmError {
    #[error("Audio decoding error: {0}")]
    Audio(#[from] AudioError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while turning an audio file into a [`SampleBuffer`](crate::audio::SampleBuffer)
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors raised by the analysis core
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The buffer cannot be analyzed at all.
    #[error("Invalid sample buffer: {reason}")]
    InvalidBuffer { reason: String },

    /// A component needs more samples than the buffer holds. Components degrade
    /// to empty output on this error instead of propagating it.
    #[error("Insufficient data for {component}: need {required} samples, got {actual}")]
    InsufficientData {
        component: &'static str,
        required: usize,
        actual: usize,
    },

    /// An assembled rhythm map contradicts its own invariants.
    #[error("Rhythm map consistency violation in {field}: {details}")]
    ConsistencyViolation { field: String, details: String },

    #[error("FFT processing failed: {reason}")]
    FftFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using RhythmError
pub type Result<T> = std::result::Result<T, RhythmError>;

impl RhythmError {
    /// Check if this error is recoverable (can be retried)
    ///
    /// Analysis is deterministic, so only the I/O-bound decoding side can
    /// succeed on a second attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Audio(AudioError::LoadFailed { .. })
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Audio(AudioError::UnsupportedFormat { format }) => {
                format!("Audio format '{}' is not supported. Supported formats: wav, mp3, flac, ogg, m4a, aac", format)
            }
            Self::Analysis(AnalysisError::InvalidBuffer { reason }) => {
                format!("The decoded audio cannot be analyzed: {}", reason)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        let io: RhythmError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(io.is_recoverable());

        let load: RhythmError = AudioError::LoadFailed { path: "a.wav".into() }.into();
        assert!(load.is_recoverable());

        let violation: RhythmError = AnalysisError::ConsistencyViolation {
            field: "beats".into(),
            details: "beyond duration".into(),
        }
        .into();
        assert!(!violation.is_recoverable());
    }

    #[test]
    fn test_user_message_mentions_path() {
        let err: RhythmError = AudioError::LoadFailed { path: "voice.mp3".into() }.into();
        assert!(err.user_message().contains("voice.mp3"));

        let err: RhythmError = AnalysisError::InsufficientData {
            component: "beat_tracker",
            required: 2048,
            actual: 10,
        }
        .into();
        assert!(err.user_message().contains("beat_tracker"));
    }
}
