/*!
 * Media handling: probing sources, sizing the video bitrate, building the
 * encoder command and running it with progress reporting.
 */

pub mod bitrate;
pub mod command;
pub mod probe;
pub mod runner;

pub use bitrate::{allocate, minimum_target_size_bytes};
pub use command::{CompressionJob, Container, EncodeCommand, EncodeCommandBuilder, SubtitleMode, escape_filter_path};
pub use probe::{MediaMetadata, MediaProbe, DEFAULT_AUDIO_BITRATE_BPS};
pub use runner::{EncodeRunner, ProgressSample, ProgressTracker, RunReport, RunState};
