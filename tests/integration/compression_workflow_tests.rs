/*!
 * Integration tests for whole compression jobs with scripted tools
 */
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use vidsqueeze::app_config::EncoderConfig;
use vidsqueeze::cancellation::CancellationToken;
use vidsqueeze::compression::{Compressor, JobEvent, JobEventKind, JobRequest};
use vidsqueeze::errors::{JobError, JobStage};
use vidsqueeze::media::{Container, EncodeCommandBuilder, EncodeRunner, MediaProbe, SubtitleMode};
use crate::common;

fn compressor_with(ffprobe: &Path, ffmpeg: &Path) -> Compressor {
    common::init_test_logging();
    let config = EncoderConfig {
        ffmpeg_path: ffmpeg.display().to_string(),
        ..EncoderConfig::default()
    };
    Compressor::new(
        MediaProbe::new(ffprobe, Duration::from_secs(10)),
        EncodeCommandBuilder::from_config(&config),
        EncodeRunner::new(),
    )
}

fn request(source_path: PathBuf, target_size_bytes: f64) -> JobRequest {
    JobRequest {
        source_path,
        subtitle_mode: SubtitleMode::None,
        subtitle_path: None,
        container: Container::Mp4,
        target_size_bytes,
    }
}

async fn collect_events(mut receiver: mpsc::UnboundedReceiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    events
}

/// Probe, allocate and encode a single job end to end
#[tokio::test]
async fn test_compress_one_withScriptedTools_shouldWriteOutput() {
    let temp_dir = common::create_temp_dir().unwrap();
    let ffprobe = common::create_fake_ffprobe(temp_dir.path(), "60.000000", "N/A").unwrap();
    let ffmpeg = common::create_fake_ffmpeg(temp_dir.path()).unwrap();
    let source = common::create_test_file(temp_dir.path(), "clip.mp4", "").unwrap();

    let job = request(source, 10.0 * 1024.0 * 1024.0).validate().unwrap();
    let (sink, mut samples) = mpsc::unbounded_channel();

    let outcome = compressor_with(&ffprobe, &ffmpeg)
        .compress_one(&job, sink, CancellationToken::new())
        .await
        .unwrap();

    // (10 MiB * 8 - 128 kbps * 60 s) / 60 s
    assert_eq!(outcome.video_bitrate_kbps, 1270);
    assert!(outcome.metadata.audio_bitrate_defaulted);
    assert_eq!(outcome.output_path, temp_dir.path().join("clip_compressed.mp4"));
    assert!(outcome.output_path.exists());

    let mut percents = Vec::new();
    while let Ok(sample) = samples.try_recv() {
        percents.push(sample.percent);
    }
    assert_eq!(percents, vec![25, 50, 75, 100]);
}

/// A target too small for the audio track never reaches the encoder
#[tokio::test]
async fn test_compress_one_withInfeasibleTarget_shouldFailBeforeEncoding() {
    let temp_dir = common::create_temp_dir().unwrap();
    let ffprobe = common::create_fake_ffprobe(temp_dir.path(), "60.0", "128000").unwrap();
    let ffmpeg = common::create_fake_ffmpeg(temp_dir.path()).unwrap();
    let source = common::create_test_file(temp_dir.path(), "clip.mp4", "").unwrap();

    let job = request(source, 100_000.0).validate().unwrap();
    let (sink, _samples) = mpsc::unbounded_channel();

    let failure = compressor_with(&ffprobe, &ffmpeg)
        .compress_one(&job, sink, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, JobStage::Allocate);
    match failure.error {
        JobError::InfeasibleTargetSize { kbps, minimum_bytes } => {
            assert_eq!(kbps, -115);
            assert!(minimum_bytes > 100_000);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!temp_dir.path().join("clip_compressed.mp4").exists());
}

/// A failing encoder is reported with the encode stage
#[tokio::test]
async fn test_compress_one_withFailingEncoder_shouldReportEncodeStage() {
    let temp_dir = common::create_temp_dir().unwrap();
    let ffprobe = common::create_fake_ffprobe(temp_dir.path(), "60.0", "128000").unwrap();
    let ffmpeg = common::create_failing_ffmpeg(temp_dir.path()).unwrap();
    let source = common::create_test_file(temp_dir.path(), "clip.mp4", "").unwrap();

    let job = request(source, 50_000_000.0).validate().unwrap();
    let (sink, _samples) = mpsc::unbounded_channel();

    let failure = compressor_with(&ffprobe, &ffmpeg)
        .compress_one(&job, sink, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, JobStage::Encode);
    assert!(failure.to_string().contains("Unknown encoder"));
}

/// One bad job among several leaves the others untouched
#[tokio::test]
async fn test_run_jobs_withMixedJobs_shouldIsolateFailures() {
    let temp_dir = common::create_temp_dir().unwrap();
    let ffprobe = common::create_fake_ffprobe(temp_dir.path(), "60.0", "128000").unwrap();
    let ffmpeg = common::create_fake_ffmpeg(temp_dir.path()).unwrap();
    let first = common::create_test_file(temp_dir.path(), "first.mp4", "").unwrap();
    let third = common::create_test_file(temp_dir.path(), "third.mp4", "").unwrap();

    let requests = vec![
        request(first, 50_000_000.0),
        request(temp_dir.path().join("missing.mp4"), 50_000_000.0),
        request(third, 50_000_000.0),
    ];
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let results = compressor_with(&ffprobe, &ffmpeg)
        .run_jobs(requests, events_tx, CancellationToken::new())
        .await;
    let events = collect_events(events_rx).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[2].is_ok());
    let failure = results[1].as_ref().unwrap_err();
    assert_eq!(failure.stage, JobStage::Validate);
    assert!(matches!(failure.error, JobError::MissingFile(_)));

    assert!(temp_dir.path().join("first_compressed.mp4").exists());
    assert!(temp_dir.path().join("third_compressed.mp4").exists());

    for job_index in 0..3 {
        let finished = events
            .iter()
            .filter(|e| e.job_index == job_index && matches!(e.kind, JobEventKind::Finished(_)))
            .count();
        assert_eq!(finished, 1, "job {} finished {} times", job_index, finished);
    }
    // the invalid job never started
    assert!(!events.iter().any(|e| e.job_index == 1 && matches!(e.kind, JobEventKind::Started)));

    // progress within each job never goes backwards
    for job_index in [0, 2] {
        let percents: Vec<u8> = events
            .iter()
            .filter(|e| e.job_index == job_index)
            .filter_map(|e| match &e.kind {
                JobEventKind::Progress(sample) => Some(sample.percent),
                _ => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
        assert_eq!(percents.last(), Some(&100));
    }
}

/// A parallelism cap of one still completes every job
#[tokio::test]
async fn test_run_jobs_withSingleSlot_shouldCompleteAll() {
    let temp_dir = common::create_temp_dir().unwrap();
    let ffprobe = common::create_fake_ffprobe(temp_dir.path(), "60.0", "128000").unwrap();
    let ffmpeg = common::create_fake_ffmpeg(temp_dir.path()).unwrap();
    let requests: Vec<JobRequest> = (0..3)
        .map(|i| {
            let source = common::create_test_file(temp_dir.path(), &format!("part{}.mp4", i), "").unwrap();
            request(source, 50_000_000.0)
        })
        .collect();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();

    let results = compressor_with(&ffprobe, &ffmpeg)
        .with_max_parallel_jobs(1)
        .run_jobs(requests, events_tx, CancellationToken::new())
        .await;

    assert!(results.iter().all(|r| r.is_ok()));
}

/// Cancelling stops every running job
#[tokio::test]
async fn test_run_jobs_cancelled_shouldMarkJobsCancelled() {
    let temp_dir = common::create_temp_dir().unwrap();
    let ffprobe = common::create_fake_ffprobe(temp_dir.path(), "600.0", "128000").unwrap();
    let ffmpeg = common::create_script(temp_dir.path(), "slow_ffmpeg.sh", "sleep 30").unwrap();
    let requests: Vec<JobRequest> = (0..2)
        .map(|i| {
            let source = common::create_test_file(temp_dir.path(), &format!("long{}.mp4", i), "").unwrap();
            request(source, 500_000_000.0)
        })
        .collect();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let results = compressor_with(&ffprobe, &ffmpeg)
        .run_jobs(requests, events_tx, cancel)
        .await;

    assert!(results.iter().all(|r| r.as_ref().is_err_and(|f| f.is_cancelled())));
}
