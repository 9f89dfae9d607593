use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use log::{debug, warn};
use tokio::process::Command;

use crate::app_config::EncoderConfig;
use crate::errors::ProbeError;

/// Bitrate assumed for the first audio stream when the probe cannot report one
pub const DEFAULT_AUDIO_BITRATE_BPS: u64 = 128_000;

/// Metadata read from a source file, once per job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMetadata {
    /// Container duration in seconds, always > 0
    pub duration_seconds: f64,
    /// Bitrate of the first audio stream in bits per second
    pub audio_bitrate_bps: u64,
    /// Set when `audio_bitrate_bps` is the fallback rather than a probed value
    pub audio_bitrate_defaulted: bool,
}

/// Parse the probe's duration answer
pub fn parse_duration(raw: &str) -> Result<f64, ProbeError> {
    let first = raw.trim().lines().next().unwrap_or("").trim();
    match first.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ProbeError::InvalidDuration(first.to_string())),
    }
}

/// Parse the probe's audio bitrate answer, `None` when it has to be defaulted
pub fn parse_audio_bitrate(raw: &str) -> Option<u64> {
    let first = raw.trim().lines().next().unwrap_or("").trim();
    match first.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(bps) => Some(bps),
    }
}

/// Queries the external probe tool for duration and audio bitrate
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe_path: PathBuf,
    timeout: Duration,
    fallback_audio_bitrate_bps: u64,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::from_config(&EncoderConfig::default())
    }
}

impl MediaProbe {
    pub fn new<P: Into<PathBuf>>(ffprobe_path: P, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
            fallback_audio_bitrate_bps: DEFAULT_AUDIO_BITRATE_BPS,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self {
            ffprobe_path: PathBuf::from(&config.ffprobe_path),
            timeout: Duration::from_secs(config.probe_timeout_secs),
            fallback_audio_bitrate_bps: config.fallback_audio_bitrate_bps,
        }
    }

    /// Read duration and first-audio-stream bitrate of `path`
    ///
    /// An unreadable duration is fatal. An unreadable audio bitrate falls back
    /// to the configured default with `audio_bitrate_defaulted` set.
    pub async fn probe<P: AsRef<Path>>(&self, path: P) -> Result<MediaMetadata, ProbeError> {
        let path = path.as_ref();

        let (stdout, stderr) = self
            .query(path, &["-show_entries", "format=duration"])
            .await?;
        let duration_seconds = match parse_duration(&stdout) {
            Ok(duration) => duration,
            // a failing probe prints nothing on stdout; surface its complaint instead
            Err(ProbeError::InvalidDuration(raw)) if raw.is_empty() => {
                let complaint = stderr.trim().lines().last().unwrap_or("").trim();
                return Err(ProbeError::InvalidDuration(complaint.to_string()));
            }
            Err(e) => return Err(e),
        };

        let (stdout, _) = self
            .query(path, &["-select_streams", "a:0", "-show_entries", "stream=bit_rate"])
            .await?;
        let metadata = match parse_audio_bitrate(&stdout) {
            Some(audio_bitrate_bps) => MediaMetadata {
                duration_seconds,
                audio_bitrate_bps,
                audio_bitrate_defaulted: false,
            },
            None => {
                warn!(
                    "Audio bitrate unavailable for {} (got '{}'), assuming {} bps",
                    path.display(),
                    stdout.trim(),
                    self.fallback_audio_bitrate_bps
                );
                MediaMetadata {
                    duration_seconds,
                    audio_bitrate_bps: self.fallback_audio_bitrate_bps,
                    audio_bitrate_defaulted: true,
                }
            }
        };

        debug!(
            "Probed {}: {:.3}s, audio {} bps",
            path.display(),
            metadata.duration_seconds,
            metadata.audio_bitrate_bps
        );
        Ok(metadata)
    }

    /// Run one probe query, returning stdout and stderr as text
    async fn query(&self, path: &Path, selector: &[&str]) -> Result<(String, String), ProbeError> {
        let probe_future = Command::new(&self.ffprobe_path)
            .args(["-v", "error"])
            .args(selector)
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = probe_future => {
                result.map_err(|e| ProbeError::Launch(format!("{}: {}", self.ffprobe_path.display(), e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(ProbeError::Timeout(self.timeout.as_secs()));
            }
        };

        Ok((
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}
