/*!
 * # vidsqueeze
 *
 * Size-targeted video compression and subtitle translation.
 *
 * ## Features
 *
 * - Probe a video's duration and audio bitrate with ffprobe
 * - Pick the video bitrate that makes the output fit a size limit
 * - Re-encode with ffmpeg, muxing (soft) or burning (hard) a subtitle file
 * - Live per-job progress with percentage and ETA, many jobs at once
 * - Translate SRT files entry by entry with bounded concurrency
 *
 * ## Architecture
 *
 * - `media`: probing, bitrate allocation, command building and the encode runner
 * - `compression`: per-job orchestration and concurrent job execution
 * - `subtitle_processor`: SRT parsing and writing
 * - `translation`: batch translation and the file-level service
 * - `providers`: translation service clients
 * - `app_config`: Configuration management
 * - `app_controller`: progress display around compression and translation
 * - `cancellation`: cooperative cancellation token
 * - `file_utils`: File system operations
 * - `language_utils`: language code normalization
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod cancellation;
pub mod compression;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cancellation::CancellationToken;
pub use compression::{Compressor, JobEvent, JobEventKind, JobOutcome, JobRequest};
pub use errors::{AppError, EncodeError, JobError, JobFailure, ProbeError, ProviderError, SubtitleError, TranslationError};
pub use media::{EncodeCommandBuilder, EncodeRunner, MediaProbe};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::{BatchTranslator, TranslationService};
