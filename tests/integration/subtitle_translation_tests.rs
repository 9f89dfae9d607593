/*!
 * Integration tests for file-level subtitle translation
 */

use std::fs;
use std::sync::Arc;
use anyhow::Result;

use vidsqueeze::app_config::{TranslationConfig, TranslationProvider};
use vidsqueeze::cancellation::CancellationToken;
use vidsqueeze::providers::mock::MockProvider;
use vidsqueeze::subtitle_processor::SubtitleCollection;
use vidsqueeze::translation::TranslationService;
use crate::common;

/// The translated file sits next to the input with timing untouched
#[tokio::test]
async fn test_translate_file_withSampleFile_shouldWriteTranslatedSibling() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let service = TranslationService::new(Arc::new(MockProvider::working()), 4, "en", "fr")?;

    let translation = service.translate_file(&input, &CancellationToken::new(), |_, _| {}).await?;

    assert_eq!(translation.output_path, temp_dir.path().join("movie_translated.srt"));
    let original = SubtitleCollection::read_from_file(&input)?;
    let translated = SubtitleCollection::read_from_file(&translation.output_path)?;
    assert_eq!(translated.entries.len(), original.entries.len());
    for (before, after) in original.entries.iter().zip(&translated.entries) {
        assert_eq!(after.seq_num, before.seq_num);
        assert_eq!(after.start_time_ms, before.start_time_ms);
        assert_eq!(after.end_time_ms, before.end_time_ms);
        assert_eq!(after.text, format!("[TRANSLATED to fr] {}", before.text));
    }
    Ok(())
}

/// BOM and Windows line endings are written back as they came in
#[tokio::test]
async fn test_translate_file_withBomAndCrlf_shouldPreserveEncoding() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nGood morning\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nGood night\r\n\r\n";
    let input = common::create_test_file(temp_dir.path(), "crlf.srt", content)?;
    let service = TranslationService::new(Arc::new(MockProvider::echo()), 2, "en", "de")?;

    let translation = service.translate_file(&input, &CancellationToken::new(), |_, _| {}).await?;

    assert_eq!(fs::read_to_string(&translation.output_path)?, content);
    Ok(())
}

/// Progress reaches the entry count
#[tokio::test]
async fn test_translate_file_withCallback_shouldReachTotal() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let service = TranslationService::new(Arc::new(MockProvider::jittery(5)), 2, "en", "fr")?;
    let highest = Arc::new(parking_lot::Mutex::new((0usize, 0usize)));

    let highest_in_callback = Arc::clone(&highest);
    service
        .translate_file(&input, &CancellationToken::new(), move |completed, total| {
            let mut best = highest_in_callback.lock();
            if completed > best.0 {
                *best = (completed, total);
            }
        })
        .await?;

    assert_eq!(*highest.lock(), (3, 3));
    Ok(())
}

/// A cancelled translation leaves no output file behind
#[tokio::test]
async fn test_translate_file_cancelled_shouldNotWriteOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let service = TranslationService::new(Arc::new(MockProvider::working()), 2, "en", "fr")?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service.translate_file(&input, &cancel, |_, _| {}).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("movie_translated.srt").exists());
    Ok(())
}

/// The offline provider can be chosen through configuration
#[tokio::test]
async fn test_from_config_withEchoProvider_shouldCopyTexts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let config = TranslationConfig {
        provider: TranslationProvider::Echo,
        ..TranslationConfig::default()
    };
    let service = TranslationService::from_config(&config, "English", "spa")?;
    assert_eq!(service.target_language(), "es");

    let translation = service.translate_file(&input, &CancellationToken::new(), |_, _| {}).await?;

    let original = SubtitleCollection::read_from_file(&input)?;
    let copied = SubtitleCollection::read_from_file(&translation.output_path)?;
    assert_eq!(copied.entries, original.entries);
    assert_eq!(translation.report.failure_count(), 0);
    Ok(())
}

/// Multi-paragraph replies still produce one block per entry
#[tokio::test]
async fn test_translate_file_withParagraphBreaksInReply_shouldWriteReadableFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nBye\n\n";
    let input = common::create_test_file(temp_dir.path(), "short.srt", content)?;
    let provider = MockProvider::working().with_custom_response(|request| format!("{}\n\n{}", request.text, request.text));
    let service = TranslationService::new(Arc::new(provider), 2, "en", "fr")?;

    let translation = service.translate_file(&input, &CancellationToken::new(), |_, _| {}).await?;

    let written = SubtitleCollection::read_from_file(&translation.output_path)?;
    let texts: Vec<&str> = written.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello\nHello", "Bye\nBye"]);
    Ok(())
}
