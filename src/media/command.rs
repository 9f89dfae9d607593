use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::anyhow;

use crate::app_config::EncoderConfig;
use crate::errors::JobError;
use crate::file_utils::FileManager;

// @module: Encoder command construction

/// How a subtitle file is combined with the video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleMode {
    #[default]
    None,
    /// Separate selectable subtitle stream
    Soft,
    /// Burned into the picture
    Hard,
}

impl fmt::Display for SubtitleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Soft => "soft",
            Self::Hard => "hard",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SubtitleMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "soft" => Ok(Self::Soft),
            "hard" => Ok(Self::Hard),
            _ => Err(anyhow!("Invalid subtitle mode: {} (expected none, soft or hard)", s)),
        }
    }
}

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
        }
    }

    /// Codec soft subtitles are converted to
    pub fn subtitle_codec(&self) -> &'static str {
        match self {
            Self::Mp4 => "mov_text",
            Self::Mkv => "srt",
        }
    }

    /// Flags that put the index at the front of the file
    pub fn streamable_flags(&self) -> [&'static str; 2] {
        match self {
            Self::Mp4 => ["-movflags", "+faststart"],
            Self::Mkv => ["-cues_to_front", "1"],
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for Container {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            _ => Err(anyhow!("Invalid container: {} (expected mp4 or mkv)", s)),
        }
    }
}

/// A validated request to compress one file
///
/// Only obtainable through [`CompressionJob::new`], so every instance has a
/// positive target size, existing input files and a subtitle file exactly
/// when the mode needs one.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionJob {
    source_path: PathBuf,
    subtitle_mode: SubtitleMode,
    subtitle_path: Option<PathBuf>,
    container: Container,
    target_size_bytes: f64,
}

impl CompressionJob {
    pub fn new(
        source_path: impl Into<PathBuf>,
        subtitle_mode: SubtitleMode,
        subtitle_path: Option<PathBuf>,
        container: Container,
        target_size_bytes: f64,
    ) -> Result<Self, JobError> {
        let source_path = source_path.into();

        if !(target_size_bytes.is_finite() && target_size_bytes > 0.0) {
            return Err(JobError::InvalidTargetSize(target_size_bytes));
        }

        match (subtitle_mode, &subtitle_path) {
            (SubtitleMode::None, Some(_)) => return Err(JobError::UnexpectedSubtitleFile),
            (SubtitleMode::Soft | SubtitleMode::Hard, None) => {
                return Err(JobError::SubtitleFileMissing(subtitle_mode.to_string()));
            }
            _ => {}
        }

        if !FileManager::file_exists(&source_path) {
            return Err(JobError::MissingFile(source_path.display().to_string()));
        }
        if let Some(subtitle) = &subtitle_path {
            if !FileManager::file_exists(subtitle) {
                return Err(JobError::MissingFile(subtitle.display().to_string()));
            }
        }

        Ok(Self {
            source_path,
            subtitle_mode,
            subtitle_path,
            container,
            target_size_bytes,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn subtitle_mode(&self) -> SubtitleMode {
        self.subtitle_mode
    }

    pub fn subtitle_path(&self) -> Option<&Path> {
        self.subtitle_path.as_deref()
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn target_size_bytes(&self) -> f64 {
        self.target_size_bytes
    }

    /// Directory the encoder runs in
    pub fn working_dir(&self) -> PathBuf {
        match self.source_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Where the compressed file is written
    pub fn output_path(&self) -> PathBuf {
        FileManager::compressed_output_path(&self.source_path, self.container.extension())
    }
}

/// Fully resolved encoder invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The child runs here so input and output names stay relative
    pub working_dir: PathBuf,
    pub output_path: PathBuf,
}

impl EncodeCommand {
    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|arg| {
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("\"{}\"", arg.replace('"', "\\\""))
                } else {
                    arg
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for EncodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Escape a path for use as the value of a filter option in `-vf`
///
/// Backslashes become forward slashes first. ffmpeg then unescapes the
/// argument twice: once when splitting the filter graph and once when
/// splitting the filter's options, so each level gets its own pass.
pub fn escape_filter_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let option_level = escape_with(&normalized, &['\\', '\'', ':']);
    escape_with(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_with(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        if special.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Builds encoder argument lists from jobs and allocated bitrates
#[derive(Debug, Clone)]
pub struct EncodeCommandBuilder {
    ffmpeg_path: PathBuf,
    video_codec: String,
    preset: String,
    audio_codec: String,
    audio_bitrate_kbps: u32,
}

impl Default for EncodeCommandBuilder {
    fn default() -> Self {
        Self::from_config(&EncoderConfig::default())
    }
}

impl EncodeCommandBuilder {
    pub fn from_config(config: &EncoderConfig) -> Self {
        Self {
            ffmpeg_path: PathBuf::from(&config.ffmpeg_path),
            video_codec: config.video_codec.clone(),
            preset: config.preset.clone(),
            audio_codec: config.audio_codec.clone(),
            audio_bitrate_kbps: config.audio_bitrate_kbps,
        }
    }

    /// Assemble the command for `job` at `video_bitrate_kbps`
    ///
    /// The bitrate is taken as given; feasibility is checked by the caller.
    pub fn build(&self, job: &CompressionJob, video_bitrate_kbps: i64) -> EncodeCommand {
        let working_dir = job.working_dir();
        let output_path = job.output_path();
        let container = job.container();

        let mut args: Vec<String> = vec!["-i".into(), file_name_of(job.source_path())];

        let subtitle_arg = job
            .subtitle_path()
            .map(|subtitle| subtitle_relative_to(subtitle, &working_dir));

        if let (SubtitleMode::Soft, Some(subtitle)) = (job.subtitle_mode(), &subtitle_arg) {
            args.extend([
                "-i".to_string(),
                subtitle.clone(),
                "-c:s".to_string(),
                container.subtitle_codec().to_string(),
            ]);
            args.extend(["-map", "0:v", "-map", "0:a", "-map", "1:s"].map(String::from));
        }

        args.extend([
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-b:v".to_string(),
            format!("{}k", video_bitrate_kbps),
            "-preset".to_string(),
            self.preset.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            format!("{}k", self.audio_bitrate_kbps),
        ]);
        args.extend(container.streamable_flags().map(String::from));

        if let (SubtitleMode::Hard, Some(subtitle)) = (job.subtitle_mode(), &subtitle_arg) {
            args.push("-vf".to_string());
            args.push(format!("subtitles={}", escape_filter_path(subtitle)));
        }

        args.push(file_name_of(&output_path));
        args.push("-y".to_string());

        EncodeCommand {
            program: self.ffmpeg_path.clone(),
            args,
            working_dir,
            output_path,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Subtitle path as seen from the encoder's working directory
fn subtitle_relative_to(subtitle: &Path, working_dir: &Path) -> String {
    FileManager::relative_to(subtitle, working_dir)
        .unwrap_or_else(|| subtitle.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
