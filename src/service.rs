use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

use crate::keys::KeyPool;
use crate::ocr::OcrEngine;
use crate::providers::{
    ErrorKind, GeminiImageProvider, LocalOcrProvider, Provider, TranslationRequest,
    TranslationResult,
};
use crate::settings::{self, SettingsStore};
use image::DynamicImage;

/// Maps string provider ids to instances. Registration order is the order
/// `list` reports, so the UI shows providers in a stable order.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

/// UI-facing description of one registered provider.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub configured: bool,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Standard wiring: the direct Gemini provider plus, when an OCR engine
    /// is available, the local-OCR provider. Both share one key pool so
    /// rotation stays consistent across providers.
    pub fn with_defaults(store: Arc<dyn SettingsStore>, engine: Option<Arc<dyn OcrEngine>>) -> Self {
        let pool = Arc::new(KeyPool::load(store));
        let mut registry = Self::new();
        registry.register(Arc::new(GeminiImageProvider::new(pool.clone())));
        if let Some(engine) = engine {
            registry.register(Arc::new(LocalOcrProvider::new(pool, engine)));
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        debug!(
            "registered provider: {} ({})",
            provider.display_name(),
            provider.provider_id()
        );
        self.providers.push(provider);
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|provider| provider.provider_id() == provider_id)
            .cloned()
    }

    pub fn list(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|provider| ProviderInfo {
                id: provider.provider_id(),
                display_name: provider.display_name(),
                configured: provider.is_configured(),
            })
            .collect()
    }

    pub fn configured_ids(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|provider| provider.is_configured())
            .map(|provider| provider.provider_id())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point for a capture: validates the image, resolves the active
/// provider from settings and hands the request to it. Every failure comes
/// back as a classified `TranslationResult::Error`; nothing here returns
/// `Err` or panics into the UI layer.
pub struct TranslationService {
    store: Arc<dyn SettingsStore>,
    registry: ProviderRegistry,
}

impl TranslationService {
    pub fn new(store: Arc<dyn SettingsStore>, registry: ProviderRegistry) -> Self {
        Self { store, registry }
    }

    pub fn active_provider(&self) -> Option<Arc<dyn Provider>> {
        let id = settings::active_provider(self.store.as_ref());
        self.registry.get(&id)
    }

    /// Switches the active provider; `false` when the id is not registered.
    pub fn set_active_provider(&self, provider_id: &str) -> bool {
        match self.registry.get(provider_id) {
            Some(provider) => {
                self.store
                    .set(settings::KEY_ACTIVE_PROVIDER, provider_id);
                debug!("active provider set to {}", provider.display_name());
                true
            }
            None => {
                error!("provider not registered: {}", provider_id);
                false
            }
        }
    }

    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.registry.list()
    }

    pub async fn translate(&self, image: &DynamicImage) -> TranslationResult {
        let lang = settings::ui_language(self.store.as_ref());

        if image.width() == 0 || image.height() == 0 {
            return TranslationResult::error(lang.error_image_empty(), ErrorKind::InvalidImage);
        }

        let Some(provider) = self.active_provider() else {
            return TranslationResult::error(lang.error_no_provider(), ErrorKind::Unknown);
        };

        if !provider.is_configured() {
            return TranslationResult::error(
                lang.error_no_api_key(provider.display_name()),
                ErrorKind::NoApiKey,
            );
        }

        let request = TranslationRequest {
            image: image.clone(),
            context_prompt: settings::context_prompt(self.store.as_ref()),
            source_lang: "ja".to_string(),
            target_lang: lang.code().to_string(),
        };

        let display_name = provider.display_name();
        debug!("sending translation to {}", display_name);
        // A provider fault must surface as a classified error, not unwind
        // into the session task and leave the loading flag stuck.
        let outcome = AssertUnwindSafe(async move { provider.translate_image(request).await })
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                error!("{} faulted during translation", display_name);
                TranslationResult::error(lang.error_unknown(), ErrorKind::Unknown)
            }
        };
        match &result {
            TranslationResult::Success { translated_text } => {
                debug!(
                    "translation succeeded ({} chars)",
                    translated_text.chars().count()
                );
            }
            TranslationResult::Error(err) => {
                error!("translation failed: {} ({:?})", err.message, err.kind);
            }
        }
        result
    }
}
