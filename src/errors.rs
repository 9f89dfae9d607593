/*!
 * Error types for the vidsqueeze application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with translation provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// Errors raised while probing a media file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// Duration missing, unparsable or not strictly positive
    #[error("could not determine video duration (got '{0}')")]
    InvalidDuration(String),

    /// The probe tool could not be started or returned garbage
    #[error("failed to run ffprobe: {0}")]
    Launch(String),

    /// The probe tool did not answer in time
    #[error("ffprobe timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors raised by the encoder process runner
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The encoder binary could not be started
    #[error("failed to start encoder: {0}")]
    Spawn(String),

    /// The encoder exited with a non-zero status
    #[error("encoder exited with {}: {}", exit_label(.code), .stderr_tail)]
    Failed {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Last lines of the encoder's diagnostic stream
        stderr_tail: String,
    },

    /// The run was cancelled and the child terminated
    #[error("encode cancelled")]
    Cancelled,

    /// Reading the child's streams failed
    #[error("I/O error while monitoring encoder: {0}")]
    Io(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Errors that end a single compression job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// A subtitle mode was requested without a subtitle file
    #[error("subtitle mode '{0}' requires a subtitle file")]
    SubtitleFileMissing(String),

    /// A subtitle file was supplied but no subtitle mode selected
    #[error("a subtitle file was supplied but the subtitle mode is 'none'")]
    UnexpectedSubtitleFile,

    /// Target size is zero, negative or not a number
    #[error("target size must be greater than 0 (got {0})")]
    InvalidTargetSize(f64),

    /// Source or subtitle file is not on disk
    #[error("file does not exist: {0}")]
    MissingFile(String),

    /// The target is too small to hold the audio track alone
    #[error("target size is too small: computed video bitrate is {kbps} kbps; choose at least {minimum_bytes} bytes")]
    InfeasibleTargetSize {
        /// The computed (non-positive) video bitrate
        kbps: i64,
        /// Smallest target size that leaves room for video
        minimum_bytes: u64,
    },

    /// Probing the source failed
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The encoder failed or was cancelled
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Pipeline stage a compression job failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Validate,
    Probe,
    Allocate,
    Encode,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::Probe => "probe",
            Self::Allocate => "allocate",
            Self::Encode => "encode",
        };
        write!(f, "{}", name)
    }
}

/// Structured failure result for one compression job
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} failed: {error}")]
pub struct JobFailure {
    /// Stage the job stopped in
    pub stage: JobStage,
    /// Human-readable cause
    pub error: JobError,
}

impl JobFailure {
    pub fn new(stage: JobStage, error: impl Into<JobError>) -> Self {
        Self { stage, error: error.into() }
    }

    /// Whether the job ended because it was cancelled rather than failing
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, JobError::Encode(EncodeError::Cancelled))
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// The file is not valid UTF-8 text
    #[error("subtitle file is not valid UTF-8: {0}")]
    Encoding(String),

    /// No entry could be parsed
    #[error("no valid subtitle entries found in {0}")]
    Empty(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Language code is not in the supported list
    #[error("unsupported language code: {0}")]
    UnsupportedLanguage(String),

    /// The batch was cancelled before every entry resolved
    #[error("translation cancelled after {completed} of {total} entries")]
    Cancelled {
        completed: usize,
        total: usize,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Compression job failure
    #[error("Job error: {0}")]
    Job(#[from] JobFailure),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
