/*!
 * Subtitle file translation service.
 *
 * Reads an SRT file, translates its entries through the batch translator
 * and writes `{stem}_translated.srt` next to it once every entry resolved.
 */

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::TranslationConfig;
use crate::cancellation::CancellationToken;
use crate::errors::{ProviderError, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::{self, Provider};
use crate::subtitle_processor::SubtitleCollection;

use super::batch::{BatchProgress, BatchReport, BatchTranslator};

/// Outcome of translating one file
#[derive(Debug, Clone)]
pub struct FileTranslation {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub report: BatchReport,
}

/// Translation service bound to one language pair
#[derive(Debug, Clone)]
pub struct TranslationService {
    translator: BatchTranslator,
    source_language: String,
    target_language: String,
}

impl TranslationService {
    /// Create a service, normalizing both language codes
    pub fn new(
        provider: Arc<dyn Provider>,
        concurrency: usize,
        source_language: &str,
        target_language: &str,
    ) -> Result<Self, TranslationError> {
        let source_language = language_utils::normalize_language_code(source_language)
            .map_err(|_| TranslationError::UnsupportedLanguage(source_language.to_string()))?;
        let target_language = language_utils::normalize_language_code(target_language)
            .map_err(|_| TranslationError::UnsupportedLanguage(target_language.to_string()))?;

        Ok(Self {
            translator: BatchTranslator::new(provider, concurrency),
            source_language,
            target_language,
        })
    }

    /// Create a service from configuration
    pub fn from_config(config: &TranslationConfig, source_language: &str, target_language: &str) -> Result<Self, TranslationError> {
        let provider = providers::create_provider(config)?;
        Self::new(provider, config.concurrent_requests, source_language, target_language)
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.translator.test_connection().await
    }

    /// Translate the texts of a parsed collection
    pub async fn translate_collection(
        &self,
        collection: &SubtitleCollection,
        cancel: &CancellationToken,
        progress: Arc<BatchProgress>,
        progress_callback: impl Fn(usize, usize) + Send + Sync,
    ) -> Result<(SubtitleCollection, BatchReport), TranslationError> {
        let texts = collection.texts();
        let report = self
            .translator
            .translate_with_progress(
                &texts,
                &self.source_language,
                &self.target_language,
                cancel,
                progress,
                progress_callback,
            )
            .await?;
        let translated = collection.with_texts(report.translations.clone());
        Ok((translated, report))
    }

    /// Translate an SRT file and write the result beside it
    pub async fn translate_file<P: AsRef<Path>>(
        &self,
        input_path: P,
        cancel: &CancellationToken,
        progress_callback: impl Fn(usize, usize) + Send + Sync,
    ) -> Result<FileTranslation> {
        let input_path = input_path.as_ref();
        let collection = SubtitleCollection::read_from_file(input_path)?;
        let output_path = FileManager::translated_output_path(input_path);

        info!(
            "Translating {} entries of {} from {} to {}",
            collection.entries.len(),
            input_path.display(),
            self.source_language,
            self.target_language
        );

        let progress = Arc::new(BatchProgress::new(collection.entries.len()));
        let (translated, report) = self
            .translate_collection(&collection, cancel, progress, progress_callback)
            .await
            .with_context(|| format!("Failed to translate {}", input_path.display()))?;

        if report.failure_count() > 0 {
            warn!(
                "{} of {} entries kept their original text",
                report.failure_count(),
                collection.entries.len()
            );
        }

        translated.write_to_srt(&output_path)?;
        info!("Translation saved to {}", output_path.display());

        Ok(FileTranslation {
            input_path: input_path.to_path_buf(),
            output_path,
            report,
        })
    }
}
