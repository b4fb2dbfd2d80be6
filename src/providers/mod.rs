use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::future::Future;
use std::pin::Pin;

mod gemini;
mod local_ocr;
pub(crate) mod retry;

pub use gemini::GeminiImageProvider;
pub use local_ocr::LocalOcrProvider;

/// Classification of a failed translation, carried back to the UI so it can
/// pick a message and decide whether a manual retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoApiKey,
    InvalidApiKey,
    RateLimited,
    NetworkError,
    InvalidImage,
    ModelOverloaded,
    EmptyResponse,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct TranslationError {
    pub message: String,
    pub kind: ErrorKind,
    pub retryable: bool,
}

/// Outcome of a translation request. Failures are values, never panics or
/// `Err` results; nothing past the provider boundary can fault the caller.
#[derive(Debug, Clone)]
pub enum TranslationResult {
    Success { translated_text: String },
    Error(TranslationError),
}

impl TranslationResult {
    pub fn success(translated_text: impl Into<String>) -> Self {
        TranslationResult::Success {
            translated_text: translated_text.into(),
        }
    }

    pub fn error(message: impl Into<String>, kind: ErrorKind) -> Self {
        TranslationResult::Error(TranslationError {
            message: message.into(),
            kind,
            retryable: false,
        })
    }

    pub fn retryable_error(message: impl Into<String>, kind: ErrorKind) -> Self {
        TranslationResult::Error(TranslationError {
            message: message.into(),
            kind,
            retryable: true,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranslationResult::Success { .. })
    }
}

/// A single capture to translate, plus the stored free-text work context
/// (character names, terminology) that is folded into the prompt.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub image: DynamicImage,
    pub context_prompt: String,
    pub source_lang: String,
    pub target_lang: String,
}

pub type TranslateFuture = Pin<Box<dyn Future<Output = TranslationResult> + Send>>;

/// A pluggable strategy for turning a page image into translated text.
/// Callers must check `is_configured` first; an unconfigured provider
/// short-circuits with `NoApiKey` instead of attempting network I/O.
pub trait Provider: Send + Sync {
    fn provider_id(&self) -> &'static str;
    fn display_name(&self) -> &'static str;
    fn is_configured(&self) -> bool;
    fn translate_image(&self, request: TranslationRequest) -> TranslateFuture;
}

/// JPEG-compresses (quality 80, alpha stripped) and base64-encodes a capture
/// for the multimodal endpoint.
pub(crate) fn encode_jpeg_base64(image: &DynamicImage) -> Result<String> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, 80);
    rgb.write_with_encoder(encoder)
        .context("failed to encode capture as JPEG")?;
    Ok(BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_jpeg_base64_handles_rgba_captures() {
        let image = DynamicImage::new_rgba8(64, 64);
        let encoded = encode_jpeg_base64(&image).expect("encode");
        assert!(!encoded.is_empty());
    }
}
