/*!
 * Subtitle translation.
 *
 * - `batch`: bounded, order-preserving per-entry translation
 * - `core`: file-level service reading and writing SRT files
 */

// Re-export main types for easier usage
pub use self::batch::{BatchProgress, BatchReport, BatchTranslator, DEFAULT_CONCURRENCY};
pub use self::core::{FileTranslation, TranslationService};

// Submodules
pub mod batch;
pub mod core;
