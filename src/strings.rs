/// UI language for user-visible strings. Error messages are shown verbatim
/// in the overlay, so they are localized here rather than at the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiLanguage {
    #[default]
    Spanish,
    English,
}

impl UiLanguage {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "en" | "english" => UiLanguage::English,
            _ => UiLanguage::Spanish,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "es",
            UiLanguage::English => "en",
        }
    }

    pub fn error_no_api_key(&self, provider: &str) -> String {
        match self {
            UiLanguage::Spanish => {
                format!("Configura tu API Key en ajustes para {}", provider)
            }
            UiLanguage::English => {
                format!("Set up your API Key in settings for {}", provider)
            }
        }
    }

    pub fn error_invalid_api_key(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "API Key inválida",
            UiLanguage::English => "Invalid API Key",
        }
    }

    pub fn error_rate_limited(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "Límite de peticiones alcanzado",
            UiLanguage::English => "Rate limit reached",
        }
    }

    pub fn error_model_overloaded(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "Modelo sobrecargado. Intenta de nuevo.",
            UiLanguage::English => "Model overloaded. Try again.",
        }
    }

    pub fn error_empty_response(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "Error: Respuesta vacía de la IA",
            UiLanguage::English => "Error: Empty response from AI",
        }
    }

    pub fn error_image_corrupt(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "Error: Imagen corrupta o muy pequeña",
            UiLanguage::English => "Error: Corrupt or very small image",
        }
    }

    pub fn error_image_empty(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "Error: La imagen capturada está vacía",
            UiLanguage::English => "Error: Captured image is empty",
        }
    }

    pub fn error_unknown(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "Error desconocido",
            UiLanguage::English => "Unknown error",
        }
    }

    pub fn error_no_provider(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "No hay proveedor de traducción configurado",
            UiLanguage::English => "No translation provider configured",
        }
    }

    pub fn error_no_vertical_text(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "No se encontró texto vertical en la imagen",
            UiLanguage::English => "No vertical text found in the image",
        }
    }

    pub fn error_network(&self, detail: &str) -> String {
        match self {
            UiLanguage::Spanish => format!("Error de red: {}", detail),
            UiLanguage::English => format!("Network error: {}", detail),
        }
    }

    /// Sentinel the model is instructed to answer with for text-free pages.
    pub fn no_text_response(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "ILUSTRACIÓN SIN TEXTO",
            UiLanguage::English => "ILLUSTRATION WITHOUT TEXT",
        }
    }

    /// Name of the translation target language, as used in prompts.
    pub fn target_language_name(&self) -> &'static str {
        match self {
            UiLanguage::Spanish => "español latino",
            UiLanguage::English => "English",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_round_trip() {
        assert_eq!(UiLanguage::from_code("en"), UiLanguage::English);
        assert_eq!(UiLanguage::from_code("English"), UiLanguage::English);
        assert_eq!(UiLanguage::from_code("es"), UiLanguage::Spanish);
        // unknown codes fall back to the default pack
        assert_eq!(UiLanguage::from_code("fr"), UiLanguage::Spanish);
    }

    #[test]
    fn no_api_key_message_names_the_provider() {
        let message = UiLanguage::English.error_no_api_key("Google Gemini");
        assert!(message.contains("Google Gemini"));
    }
}
