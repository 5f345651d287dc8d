//! Error types for help-pipeline stages.
//!
//! Stage implementations surface these through `anyhow::Result`; the invoker
//! converts any failure into a per-stage report entry and never lets it
//! escape the pipeline boundary.

use std::fmt;

/// Failure raised by a single help-pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A required API key is absent from the environment.
    MissingCredential { variable: String },

    /// The request never produced a usable response (network failure,
    /// exhausted retries, malformed payload).
    Transport { stage: String, reason: String },

    /// The remote service answered but refused or mangled the request.
    RemoteRejected {
        service: String,
        status: u16,
        details: String,
    },

    /// Speech-to-text returned no transcript.
    EmptyTranscription,

    /// The language model returned no reply content.
    EmptyReply,

    /// A stage received audio in a format it cannot process.
    UnsupportedAudio { expected: String, got: String },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::MissingCredential { variable } => {
                write!(f, "Missing credential: environment variable '{}' is not set", variable)
            }
            StageError::Transport { stage, reason } => {
                write!(f, "Transport failure in stage '{}': {}", stage, reason)
            }
            StageError::RemoteRejected {
                service,
                status,
                details,
            } => {
                write!(
                    f,
                    "Service '{}' rejected the request (status {}): {}",
                    service, status, details
                )
            }
            StageError::EmptyTranscription => {
                write!(f, "No transcription available from the recorded audio")
            }
            StageError::EmptyReply => {
                write!(f, "Language model returned an empty reply")
            }
            StageError::UnsupportedAudio { expected, got } => {
                write!(f, "Unsupported audio payload: expected {}, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for StageError {}

// Convenience constructors for common failure patterns
impl StageError {
    pub fn missing_credential(variable: impl Into<String>) -> Self {
        StageError::MissingCredential {
            variable: variable.into(),
        }
    }

    pub fn transport(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        StageError::Transport {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    pub fn remote_rejected(
        service: impl Into<String>,
        status: u16,
        details: impl Into<String>,
    ) -> Self {
        StageError::RemoteRejected {
            service: service.into(),
            status,
            details: details.into(),
        }
    }

    pub fn unsupported_audio(expected: impl Into<String>, got: impl Into<String>) -> Self {
        StageError::UnsupportedAudio {
            expected: expected.into(),
            got: got.into(),
        }
    }
}
