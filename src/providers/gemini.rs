use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::retry::{self, AttemptError, AttemptFuture, TranslateCall};
use super::{
    ErrorKind, Provider, TranslateFuture, TranslationRequest, TranslationResult,
    encode_jpeg_base64,
};
use crate::keys::KeyPool;
use crate::prompts;
use crate::strings::UiLanguage;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Base64 payloads below this length cannot be a real page capture.
const MIN_IMAGE_PAYLOAD_CHARS: usize = 1000;

/// Direct multimodal provider: ships the JPEG-compressed capture plus the
/// composed instruction prompt to Gemini in a single `generateContent` call.
pub struct GeminiImageProvider {
    client: Client,
    pool: Arc<KeyPool>,
    model: String,
}

impl GeminiImageProvider {
    pub fn new(pool: Arc<KeyPool>) -> Self {
        Self {
            client: http_client(),
            pool,
            model: DEFAULT_MODEL.to_string(),
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

impl Provider for GeminiImageProvider {
    fn provider_id(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Google Gemini"
    }

    fn is_configured(&self) -> bool {
        !self.pool.is_empty()
    }

    fn translate_image(&self, request: TranslationRequest) -> TranslateFuture {
        let client = self.client.clone();
        let pool = self.pool.clone();
        let url = format!("{}/{}:generateContent", BASE_URL, self.model);
        let display_name = self.display_name();
        let configured = self.is_configured();

        Box::pin(async move {
            // the request is the single source of truth for language
            let lang = UiLanguage::from_code(&request.target_lang);
            if !configured {
                return TranslationResult::error(
                    lang.error_no_api_key(display_name),
                    ErrorKind::NoApiKey,
                );
            }

            let encoded = match encode_jpeg_base64(&request.image) {
                Ok(encoded) => encoded,
                Err(err) => {
                    debug!("capture encoding failed: {}", err);
                    return TranslationResult::error(
                        lang.error_image_corrupt(),
                        ErrorKind::InvalidImage,
                    );
                }
            };
            if encoded.len() < MIN_IMAGE_PAYLOAD_CHARS {
                return TranslationResult::error(
                    lang.error_image_corrupt(),
                    ErrorKind::InvalidImage,
                );
            }

            let prompt = prompts::image_translation_prompt(lang, &request.context_prompt);
            let body = json!({
                "contents": [{
                    "parts": [
                        {"inlineData": {"mimeType": "image/jpeg", "data": encoded}},
                        {"text": prompt}
                    ]
                }]
            });

            let call = GenerateContentCall { client, url, body };
            retry::execute_with_rotation(&call, &pool, lang, display_name).await
        })
    }
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .connect_timeout(HTTP_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// One `generateContent` POST with the key carried as a query parameter.
pub(crate) struct GenerateContentCall {
    pub(crate) client: Client,
    pub(crate) url: String,
    pub(crate) body: Value,
}

impl TranslateCall for GenerateContentCall {
    fn invoke<'a>(&'a self, api_key: &'a str) -> AttemptFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .query(&[("key", api_key)])
                .json(&self.body)
                .send()
                .await
                .map_err(|err| AttemptError::Network(err.to_string()))?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(AttemptError::Http(status.as_u16()));
            }
            extract_candidate_text(&text).ok_or(AttemptError::EmptyResponse)
        })
    }
}

/// First candidate's first text part, or `None` for an empty or malformed
/// body. A 200 with no usable candidate is still an empty response.
pub(crate) fn extract_candidate_text(body: &str) -> Option<String> {
    let payload: GenerateContentResponse = serde_json::from_str(body).ok()?;
    let text = payload
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?
        .into_iter()
        .find_map(|part| part.text)?;
    let text = text.trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
