use anyhow::{Result, anyhow};
use log::{error, warn, info};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle, MultiProgress};
use tokio::sync::mpsc;

use crate::app_config::Config;
use crate::cancellation::CancellationToken;
use crate::compression::{Compressor, JobEvent, JobEventKind, JobOutcome, JobRequest};
use crate::errors::{AppError, JobFailure};
use crate::media::RunState;
use crate::translation::{FileTranslation, TranslationService};

// @module: Application controller driving the progress display

/// Tracks the lifecycle of every job from the event stream
#[derive(Debug, Clone, PartialEq)]
pub struct JobBoard {
    states: Vec<RunState>,
}

impl JobBoard {
    pub fn new(job_count: usize) -> Self {
        Self {
            states: vec![RunState::NotStarted; job_count],
        }
    }

    /// Apply one event, returning the job's new state
    pub fn apply(&mut self, event: &JobEvent) -> Option<RunState> {
        let state = self.states.get_mut(event.job_index)?;
        *state = match &event.kind {
            JobEventKind::Started | JobEventKind::Progress(_) => RunState::Running,
            JobEventKind::Finished(Ok(_)) => RunState::Succeeded,
            JobEventKind::Finished(Err(failure)) if failure.is_cancelled() => RunState::Cancelled,
            JobEventKind::Finished(Err(_)) => RunState::Failed,
        };
        Some(*state)
    }

    pub fn state(&self, job_index: usize) -> Option<RunState> {
        self.states.get(job_index).copied()
    }

    pub fn count(&self, state: RunState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }

    pub fn all_terminal(&self) -> bool {
        self.states.iter().all(RunState::is_terminal)
    }
}

/// Totals printed after a compression run
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub results: Vec<Result<JobOutcome, JobFailure>>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Compress every request concurrently with one progress bar per job
    pub async fn compress(&self, requests: Vec<JobRequest>, cancel: CancellationToken) -> Result<CompressionSummary> {
        if requests.is_empty() {
            return Err(anyhow!("No input files to compress"));
        }

        let start_time = Instant::now();
        let multi_progress = MultiProgress::new();
        let bars: Vec<ProgressBar> = requests
            .iter()
            .map(|request| {
                let bar = multi_progress.add(ProgressBar::new(100));
                bar.set_style(job_style());
                bar.set_prefix(display_name(&request.source_path));
                bar.set_message("waiting");
                bar
            })
            .collect();

        let compressor = Compressor::from_config(&self.config.encoder);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<JobEvent>();
        let mut board = JobBoard::new(requests.len());

        let render = async {
            while let Some(event) = events_rx.recv().await {
                board.apply(&event);
                if let Some(bar) = bars.get(event.job_index) {
                    render_event(bar, &event);
                }
            }
        };

        let (results, ()) = tokio::join!(compressor.run_jobs(requests, events_tx, cancel), render);

        for (index, result) in results.iter().enumerate() {
            let name = bars.get(index).map(|b| b.prefix()).unwrap_or_default();
            match result {
                Ok(outcome) => info!(
                    "{}: {} ({} kbps, {})",
                    name,
                    outcome.output_path.display(),
                    outcome.video_bitrate_kbps,
                    format_duration(outcome.report.wall_time)
                ),
                Err(failure) if failure.is_cancelled() => warn!("{}: cancelled", name),
                Err(failure) => error!("{}: {}", name, failure),
            }
        }

        let summary = CompressionSummary {
            succeeded: board.count(RunState::Succeeded),
            failed: board.count(RunState::Failed),
            cancelled: board.count(RunState::Cancelled),
            results,
        };
        info!(
            "Compression completed: {} succeeded, {} failed, {} cancelled in {}",
            summary.succeeded,
            summary.failed,
            summary.cancelled,
            format_duration(start_time.elapsed())
        );

        Ok(summary)
    }

    /// Translate one subtitle file with a progress bar
    pub async fn translate(&self, input_file: PathBuf, cancel: CancellationToken) -> Result<FileTranslation> {
        let service = TranslationService::from_config(
            &self.config.translation,
            &self.config.source_language,
            &self.config.target_language,
        )?;

        info!(
            "Subtitle translation: {} ({} -> {})",
            self.config.translation.provider.display_name(),
            service.source_language(),
            service.target_language()
        );

        // Fail fast rather than falling back on every entry
        if let Err(e) = service.test_connection().await {
            error!("Translation service unreachable: {}", e);
            return Err(AppError::Provider(e).into());
        }

        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let result = service
            .translate_file(&input_file, &cancel, move |completed, total| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            })
            .await;

        progress_bar.finish_and_clear();
        let translation = result?;

        info!(
            "Success: {} ({} entries, {} kept original)",
            translation.output_path.display(),
            translation.report.translations.len(),
            translation.report.failure_count()
        );
        Ok(translation)
    }
}

fn job_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{prefix} [{bar:40}] {pos}% {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

fn render_event(bar: &ProgressBar, event: &JobEvent) {
    match &event.kind {
        JobEventKind::Started => bar.set_message("probing"),
        JobEventKind::Progress(sample) => {
            bar.set_position(sample.percent as u64);
            match sample.eta_seconds {
                Some(eta) => bar.set_message(format!("ETA {}", format_duration(Duration::from_secs(eta)))),
                None => bar.set_message("encoding"),
            }
        }
        JobEventKind::Finished(Ok(_)) => {
            bar.set_position(100);
            bar.finish_with_message("done");
        }
        JobEventKind::Finished(Err(failure)) if failure.is_cancelled() => {
            bar.abandon_with_message("cancelled");
        }
        JobEventKind::Finished(Err(failure)) => {
            bar.abandon_with_message(format!("{} failed", failure.stage));
        }
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// Format duration in a human-readable format
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
