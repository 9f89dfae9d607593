/*!
 * Compression orchestration.
 *
 * One job goes validate -> probe -> allocate -> build -> run. Many jobs run
 * side by side, each in its own task with its own child process and
 * tracker; their progress is funnelled into a single [`JobEvent`] channel
 * tagged with the job index.
 */

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{mpsc, Semaphore};

use crate::app_config::EncoderConfig;
use crate::cancellation::CancellationToken;
use crate::errors::{JobError, JobFailure, JobStage};
use crate::media::{
    allocate, minimum_target_size_bytes, CompressionJob, Container, EncodeCommand,
    EncodeCommandBuilder, EncodeRunner, MediaMetadata, MediaProbe, ProgressSample, RunReport,
    SubtitleMode,
};

/// Unvalidated job parameters as collected from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub source_path: PathBuf,
    pub subtitle_mode: SubtitleMode,
    pub subtitle_path: Option<PathBuf>,
    pub container: Container,
    pub target_size_bytes: f64,
}

impl JobRequest {
    pub fn validate(&self) -> Result<CompressionJob, JobFailure> {
        CompressionJob::new(
            self.source_path.clone(),
            self.subtitle_mode,
            self.subtitle_path.clone(),
            self.container,
            self.target_size_bytes,
        )
        .map_err(|e| JobFailure::new(JobStage::Validate, e))
    }
}

/// What a finished job produced
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub metadata: MediaMetadata,
    pub video_bitrate_kbps: i64,
    pub report: RunReport,
}

/// Everything needed to start the encoder for one job
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedJob {
    pub metadata: MediaMetadata,
    pub video_bitrate_kbps: i64,
    pub command: EncodeCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEventKind {
    Started,
    Progress(ProgressSample),
    Finished(Result<JobOutcome, JobFailure>),
}

/// Message on the multi-job aggregator channel
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub job_index: usize,
    pub kind: JobEventKind,
}

/// Drives probe, allocation, command building and the encoder for jobs
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    probe: MediaProbe,
    builder: EncodeCommandBuilder,
    runner: EncodeRunner,
    max_parallel_jobs: usize,
}

impl Compressor {
    pub fn new(probe: MediaProbe, builder: EncodeCommandBuilder, runner: EncodeRunner) -> Self {
        Self {
            probe,
            builder,
            runner,
            max_parallel_jobs: 0,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self {
            probe: MediaProbe::from_config(config),
            builder: EncodeCommandBuilder::from_config(config),
            runner: EncodeRunner::new(),
            max_parallel_jobs: config.max_parallel_jobs,
        }
    }

    /// Cap on encodes running at once, 0 for no cap
    pub fn with_max_parallel_jobs(mut self, max_parallel_jobs: usize) -> Self {
        self.max_parallel_jobs = max_parallel_jobs;
        self
    }

    /// Probe the source and size the video stream
    ///
    /// No command is built when the target cannot hold the audio track.
    pub async fn prepare(&self, job: &CompressionJob) -> Result<PreparedJob, JobFailure> {
        let metadata = self
            .probe
            .probe(job.source_path())
            .await
            .map_err(|e| JobFailure::new(JobStage::Probe, e))?;

        let video_bitrate_kbps = allocate(
            metadata.duration_seconds,
            metadata.audio_bitrate_bps,
            job.target_size_bytes(),
        );
        if video_bitrate_kbps <= 0 {
            let minimum_bytes =
                minimum_target_size_bytes(metadata.duration_seconds, metadata.audio_bitrate_bps);
            return Err(JobFailure::new(
                JobStage::Allocate,
                JobError::InfeasibleTargetSize {
                    kbps: video_bitrate_kbps,
                    minimum_bytes,
                },
            ));
        }

        let command = self.builder.build(job, video_bitrate_kbps);
        Ok(PreparedJob {
            metadata,
            video_bitrate_kbps,
            command,
        })
    }

    /// Compress one validated job, sending its samples to `sink`
    pub async fn compress_one(
        &self,
        job: &CompressionJob,
        sink: mpsc::UnboundedSender<ProgressSample>,
        cancel: CancellationToken,
    ) -> Result<JobOutcome, JobFailure> {
        let prepared = self.prepare(job).await?;

        info!(
            "Compressing {} at {} kbps ({:.1}s, audio {} bps{})",
            job.source_path().display(),
            prepared.video_bitrate_kbps,
            prepared.metadata.duration_seconds,
            prepared.metadata.audio_bitrate_bps,
            if prepared.metadata.audio_bitrate_defaulted { ", assumed" } else { "" }
        );

        let report = self
            .runner
            .run(&prepared.command, prepared.metadata.duration_seconds, sink, cancel)
            .await
            .map_err(|e| JobFailure::new(JobStage::Encode, e))?;

        Ok(JobOutcome {
            source_path: job.source_path().to_path_buf(),
            output_path: prepared.command.output_path,
            metadata: prepared.metadata,
            video_bitrate_kbps: prepared.video_bitrate_kbps,
            report,
        })
    }

    /// Run every request concurrently
    ///
    /// Events for all jobs go to `events`; a failing job never affects the
    /// others. Results come back in request order.
    pub async fn run_jobs(
        &self,
        requests: Vec<JobRequest>,
        events: mpsc::UnboundedSender<JobEvent>,
        cancel: CancellationToken,
    ) -> Vec<Result<JobOutcome, JobFailure>> {
        let permits = if self.max_parallel_jobs == 0 {
            requests.len().max(1)
        } else {
            self.max_parallel_jobs
        };
        let semaphore = Arc::new(Semaphore::new(permits));

        let handles: Vec<_> = requests
            .into_iter()
            .enumerate()
            .map(|(job_index, request)| {
                let compressor = self.clone();
                let events = events.clone();
                let cancel = cancel.clone();
                let semaphore = Arc::clone(&semaphore);

                tokio::spawn(async move {
                    // the semaphore is never closed, so this always holds a permit
                    let _permit = semaphore.acquire_owned().await.ok();
                    let result = compressor
                        .run_tracked(job_index, &request, &events, cancel)
                        .await;

                    let _ = events.send(JobEvent {
                        job_index,
                        kind: JobEventKind::Finished(result.clone()),
                    });
                    result
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Compression task ended abnormally: {}", e);
                    results.push(Err(JobFailure::new(
                        JobStage::Encode,
                        crate::errors::EncodeError::Io(e.to_string()),
                    )));
                }
            }
        }
        results
    }

    /// One job with its progress forwarded as [`JobEvent`]s
    async fn run_tracked(
        &self,
        job_index: usize,
        request: &JobRequest,
        events: &mpsc::UnboundedSender<JobEvent>,
        cancel: CancellationToken,
    ) -> Result<JobOutcome, JobFailure> {
        let job = request.validate()?;
        let _ = events.send(JobEvent {
            job_index,
            kind: JobEventKind::Started,
        });

        let (sink, mut samples) = mpsc::unbounded_channel();
        let forward = async {
            while let Some(sample) = samples.recv().await {
                let _ = events.send(JobEvent {
                    job_index,
                    kind: JobEventKind::Progress(sample),
                });
            }
        };

        // `sink` moves into the job, so the forwarder ends when the job does
        let (result, ()) = tokio::join!(self.compress_one(&job, sink, cancel), forward);
        result
    }
}
