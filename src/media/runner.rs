/*!
 * Encoder process runner.
 *
 * Spawns the encoder in the job's directory, follows its diagnostic stream
 * and turns `time=HH:MM:SS.ss` markers into [`ProgressSample`]s sent over a
 * channel. Each run owns its child and its tracker; nothing is shared
 * between concurrent runs.
 */

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::{Duration, Instant};

use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::cancellation::CancellationToken;
use crate::errors::EncodeError;
use super::command::EncodeCommand;

/// Number of diagnostic lines kept for failure reports
pub const STDERR_TAIL_LINES: usize = 20;

static TIME_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)").expect("static regex")
});

/// One progress observation for a running encode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// Media time the encoder has reached, in seconds
    pub elapsed_media_seconds: f64,
    /// 0..=100
    pub percent: u8,
    /// Estimated wall-clock seconds left, when it can be estimated
    pub eta_seconds: Option<u64>,
}

/// Lifecycle of one encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: RunState,
    pub wall_time: Duration,
    /// Samples sent, the forced final one included
    pub samples_emitted: usize,
    pub final_sample: ProgressSample,
}

/// Extract the media time in seconds from a line like `... time=00:01:23.45 ...`
///
/// `time=N/A` and negative times yield `None`.
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let caps = TIME_MARKER_REGEX.captures(line)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Turns diagnostic lines into non-decreasing progress samples
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration_seconds: f64,
    last_elapsed: Option<f64>,
}

impl ProgressTracker {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            last_elapsed: None,
        }
    }

    /// Sample for `line`, given the wall-clock time since the encoder started
    ///
    /// Lines without a usable marker, and markers behind the last one seen,
    /// produce nothing.
    pub fn observe(&mut self, line: &str, wall_elapsed: Duration) -> Option<ProgressSample> {
        let elapsed = parse_time_marker(line)?;
        if let Some(last) = self.last_elapsed {
            if elapsed <= last {
                return None;
            }
        }
        self.last_elapsed = Some(elapsed);
        Some(self.sample_at(elapsed, wall_elapsed))
    }

    fn sample_at(&self, elapsed: f64, wall_elapsed: Duration) -> ProgressSample {
        let duration = self.duration_seconds;
        let percent = if duration > 0.0 {
            (100.0 * elapsed / duration).floor().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        let eta_seconds = if elapsed > 0.0 && elapsed < duration {
            let remaining = wall_elapsed.as_secs_f64() * (duration / elapsed - 1.0);
            Some(remaining.round() as u64)
        } else {
            None
        };

        ProgressSample {
            elapsed_media_seconds: elapsed,
            percent,
            eta_seconds,
        }
    }

    /// The sample reported once the encoder exits successfully
    pub fn finish(&mut self) -> ProgressSample {
        self.last_elapsed = Some(self.duration_seconds);
        ProgressSample {
            elapsed_media_seconds: self.duration_seconds,
            percent: 100,
            eta_seconds: Some(0),
        }
    }
}

/// Read up to the next `\n` or `\r`, `None` at end of stream
async fn read_segment<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if buf.is_empty() {
                return Ok(None);
            }
            return Ok(Some(String::from_utf8_lossy(buf).into_owned()));
        }

        if let Some(pos) = available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            buf.extend_from_slice(&available[..pos]);
            reader.consume(pos + 1);
            return Ok(Some(String::from_utf8_lossy(buf).into_owned()));
        }

        let len = available.len();
        buf.extend_from_slice(available);
        reader.consume(len);
    }
}

/// Runs encoder commands and reports their progress
#[derive(Debug, Clone, Default)]
pub struct EncodeRunner;

impl EncodeRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `command` to completion, sending samples to `sink`
    ///
    /// A dropped receiver does not stop the encode. On success a final 100 %
    /// sample is always sent. A non-zero exit returns the last
    /// [`STDERR_TAIL_LINES`] diagnostic lines; cancellation kills the child.
    pub async fn run(
        &self,
        command: &EncodeCommand,
        duration_seconds: f64,
        sink: mpsc::UnboundedSender<ProgressSample>,
        cancel: CancellationToken,
    ) -> Result<RunReport, EncodeError> {
        if cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }

        debug!("Running in {}: {}", command.working_dir.display(), command.display());

        let started = Instant::now();
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EncodeError::Spawn(format!("{}: {}", command.program.display(), e)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodeError::Io("encoder stderr was not captured".to_string()))?;
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::with_capacity(256);

        let mut tracker = ProgressTracker::new(duration_seconds);
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut samples_emitted = 0usize;

        loop {
            let segment = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    terminate(&mut child).await;
                    return Err(EncodeError::Cancelled);
                }
                segment = read_segment(&mut reader, &mut buf) => {
                    segment.map_err(|e| EncodeError::Io(e.to_string()))?
                }
            };

            let Some(line) = segment else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(sample) = tracker.observe(line, started.elapsed()) {
                samples_emitted += 1;
                let _ = sink.send(sample);
            }

            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                return Err(EncodeError::Cancelled);
            }
            status = child.wait() => status.map_err(|e| EncodeError::Io(e.to_string()))?,
        };

        if !status.success() {
            let stderr_tail = Vec::from(tail).join("\n");
            error!("Encoder failed ({}) for {}", status, command.output_path.display());
            return Err(EncodeError::Failed {
                code: status.code(),
                stderr_tail,
            });
        }

        let final_sample = tracker.finish();
        samples_emitted += 1;
        let _ = sink.send(final_sample);

        Ok(RunReport {
            state: RunState::Succeeded,
            wall_time: started.elapsed(),
            samples_emitted,
            final_sample,
        })
    }
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Failed to kill encoder: {}", e);
    }
}
