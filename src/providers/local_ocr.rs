use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::gemini::{self, GenerateContentCall, http_client};
use super::retry;
use super::{ErrorKind, Provider, TranslateFuture, TranslationRequest, TranslationResult};
use crate::keys::KeyPool;
use crate::ocr::{OcrEngine, reconstruct_columns};
use crate::prompts;
use crate::strings::UiLanguage;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// OCR-then-text provider: runs the on-device recognizer, rebuilds the
/// vertical columns into reading order, and sends only the reconstructed
/// plain text to the text endpoint. Cheaper than shipping the image, and
/// keeps the page bitmap on the device.
pub struct LocalOcrProvider {
    engine: Arc<dyn OcrEngine>,
    client: Client,
    pool: Arc<KeyPool>,
    model: String,
}

impl LocalOcrProvider {
    pub fn new(pool: Arc<KeyPool>, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            client: http_client(),
            pool,
            model: gemini::DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }
}

impl Provider for LocalOcrProvider {
    fn provider_id(&self) -> &'static str {
        "local_ocr_gemini"
    }

    fn display_name(&self) -> &'static str {
        "Local OCR + Gemini"
    }

    fn is_configured(&self) -> bool {
        !self.pool.is_empty()
    }

    fn translate_image(&self, request: TranslationRequest) -> TranslateFuture {
        let engine = self.engine.clone();
        let client = self.client.clone();
        let pool = self.pool.clone();
        let url = format!("{}/{}:generateContent", BASE_URL, self.model);
        let display_name = self.display_name();
        let configured = self.is_configured();

        Box::pin(async move {
            let lang = UiLanguage::from_code(&request.target_lang);
            if !configured {
                return TranslationResult::error(
                    lang.error_no_api_key(display_name),
                    ErrorKind::NoApiKey,
                );
            }

            let blocks = match engine.recognize(&request.image).await {
                Ok(blocks) => blocks,
                Err(err) => {
                    // the recognizer failing to find anything is the same
                    // outcome for the user as an empty model response
                    return TranslationResult::error(
                        format!("OCR: {}", err),
                        ErrorKind::EmptyResponse,
                    );
                }
            };
            debug!("OCR produced {} blocks", blocks.len());

            let japanese_text =
                reconstruct_columns(&blocks, request.image.height() as i32);
            if japanese_text.is_empty() {
                return TranslationResult::error(
                    lang.error_no_vertical_text(),
                    ErrorKind::EmptyResponse,
                );
            }
            debug!("reconstructed {} chars of vertical text", japanese_text.chars().count());

            let prompt =
                prompts::text_translation_prompt(lang, &japanese_text, &request.context_prompt);
            let body = json!({
                "contents": [{
                    "parts": [{"text": prompt}]
                }]
            });

            let call = GenerateContentCall { client, url, body };
            retry::execute_with_rotation(&call, &pool, lang, display_name).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{RecognizeFuture, TextBlock};
    use crate::settings::{MemorySettingsStore, SettingsStore};
    use anyhow::anyhow;
    use image::DynamicImage;

    struct EmptyEngine;

    impl OcrEngine for EmptyEngine {
        fn recognize<'a>(&'a self, _image: &'a DynamicImage) -> RecognizeFuture<'a> {
            Box::pin(async { Ok(Vec::<TextBlock>::new()) })
        }
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn recognize<'a>(&'a self, _image: &'a DynamicImage) -> RecognizeFuture<'a> {
            Box::pin(async { Err(anyhow!("recognizer crashed")) })
        }
    }

    fn request() -> TranslationRequest {
        TranslationRequest {
            image: DynamicImage::new_rgb8(1000, 2000),
            context_prompt: String::new(),
            source_lang: "ja".to_string(),
            target_lang: "es".to_string(),
        }
    }

    fn provider(engine: Arc<dyn OcrEngine>) -> LocalOcrProvider {
        let store = Arc::new(MemorySettingsStore::new());
        crate::settings::set_api_keys(store.as_ref(), &["key".to_string()]);
        let pool = Arc::new(KeyPool::load(store as Arc<dyn SettingsStore>));
        LocalOcrProvider::new(pool, engine)
    }

    #[tokio::test]
    async fn no_vertical_text_maps_to_empty_response() {
        let result = provider(Arc::new(EmptyEngine)).translate_image(request()).await;
        match result {
            TranslationResult::Error(error) => {
                assert_eq!(error.kind, ErrorKind::EmptyResponse);
            }
            TranslationResult::Success { .. } => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn ocr_failure_maps_to_empty_response() {
        let result = provider(Arc::new(FailingEngine)).translate_image(request()).await;
        match result {
            TranslationResult::Error(error) => {
                assert_eq!(error.kind, ErrorKind::EmptyResponse);
                assert!(error.message.contains("recognizer crashed"));
            }
            TranslationResult::Success { .. } => panic!("expected an error"),
        }
    }
}
