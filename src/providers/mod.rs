/*!
 * Provider implementations for translation services.
 *
 * This module contains client implementations behind one trait:
 * - Google: Google-Translate-compatible web endpoint
 * - Mock: Scriptable in-process provider for tests and offline runs
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// One text to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// The text to translate
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }
}

/// Translated text returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResponse {
    pub text: String,
}

/// Common trait for all translation providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the batch translator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate a single text
    ///
    /// # Arguments
    /// * `request` - The text and language pair
    ///
    /// # Returns
    /// * `Result<TranslationResponse, ProviderError>` - The translation or an error
    async fn complete(&self, request: TranslationRequest) -> Result<TranslationResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    match config.provider {
        TranslationProvider::Google => {
            let client = google::GoogleTranslate::new_with_config(
                &config.endpoint,
                Duration::from_secs(config.timeout_secs),
                config.retry_count,
                config.retry_backoff_ms,
            )?;
            Ok(Arc::new(client))
        }
        TranslationProvider::Echo => Ok(Arc::new(mock::MockProvider::echo())),
    }
}

pub mod google;
pub mod mock;
