use crate::strings::UiLanguage;

/// Instruction prompt for the direct multimodal call: the page image travels
/// alongside this text in a single request.
pub fn image_translation_prompt(lang: UiLanguage, user_context: &str) -> String {
    let target = lang.target_language_name();
    format!(
        "You are an expert Japanese to {target} translator specializing in light novels.\n\
         \n\
         WORK CONTEXT:\n\
         {user_context}\n\
         \n\
         INSTRUCTIONS:\n\
         - The text in the image is in vertical Japanese, read from right to left.\n\
         - Translate ALL visible text to {target}.\n\
         - Maintain the appropriate narrative tone and style for light novels.\n\
         - Use character names and terms as specified in the context.\n\
         - Respond ONLY with the {target} translation.\n\
         - Do NOT include the original Japanese text.\n\
         - Do NOT add notes, comments, or explanations.\n\
         - Ignore page headers containing page numbers and titles.\n\
         - If it's an illustration without text, respond \"{no_text}\".\n\
         \n\
         Translate the Japanese text in this image to {target}.",
        target = target,
        user_context = user_context,
        no_text = lang.no_text_response(),
    )
}

/// Prompt for the text-only call used by the local-OCR provider; the page
/// text has already been reconstructed into reading order.
pub fn text_translation_prompt(lang: UiLanguage, japanese_text: &str, user_context: &str) -> String {
    let target = lang.target_language_name();
    format!(
        "You are an expert Japanese to {target} translator specializing in light novels.\n\
         \n\
         WORK CONTEXT:\n\
         {user_context}\n\
         \n\
         JAPANESE TEXT TO TRANSLATE:\n\
         {japanese_text}\n\
         \n\
         INSTRUCTIONS:\n\
         - Translate the text to {target}.\n\
         - Maintain the appropriate narrative tone and style for light novels.\n\
         - Use character names and terms as specified in the context.\n\
         - Respond ONLY with the {target} translation.\n\
         - Do NOT include the original Japanese text.\n\
         - Do NOT add notes, comments, or explanations.",
        target = target,
        user_context = user_context,
        japanese_text = japanese_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_prompt_carries_context_and_sentinel() {
        let prompt = image_translation_prompt(UiLanguage::English, "Protagonist: Kazuya");
        assert!(prompt.contains("Protagonist: Kazuya"));
        assert!(prompt.contains("ILLUSTRATION WITHOUT TEXT"));
        assert!(prompt.contains("right to left"));
    }

    #[test]
    fn text_prompt_embeds_the_japanese_text() {
        let prompt = text_translation_prompt(UiLanguage::Spanish, "こんにちは", "");
        assert!(prompt.contains("こんにちは"));
        assert!(prompt.contains("español latino"));
    }
}
