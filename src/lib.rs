//! Translation core for captured Japanese light novel pages.
//!
//! The pipeline: a screen capture arrives as a bitmap, the active provider
//! turns it into translated text (either one multimodal call, or on-device
//! OCR plus vertical-column reconstruction plus a text-only call), a bounded
//! retry loop rotates among stored API keys, and the session controller
//! publishes the history to the overlay UI. The UI itself, the capture
//! plumbing and the OCR engine live outside this crate, behind the
//! `SettingsStore` and `OcrEngine` traits.

pub mod keys;
pub mod logging;
pub mod ocr;
pub mod prompts;
mod providers;
mod service;
mod session;
pub mod settings;
pub mod strings;

pub use keys::KeyPool;
pub use ocr::{OcrEngine, Rect, TextBlock, reconstruct_columns};
pub use providers::{
    ErrorKind, GeminiImageProvider, LocalOcrProvider, Provider, TranslateFuture,
    TranslationError, TranslationRequest, TranslationResult,
};
pub use service::{ProviderInfo, ProviderRegistry, TranslationService};
pub use session::{SessionController, UiState};
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use strings::UiLanguage;
