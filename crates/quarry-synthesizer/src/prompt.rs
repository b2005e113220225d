//! Tier-specific prompt shaping

use quarry_domain::{ResponseMode, Tier};
use std::borrow::Cow;

/// Appended to prompts sent to free-form tiers
pub const JSON_ONLY_INSTRUCTION: &str = "Respond with a single JSON object only. \
Do not wrap it in prose or explanations. \
If you must use a code fence, label it json.";

/// The prompt a tier actually sends
///
/// Strict tiers send the prompt unchanged; free-form tiers get an explicit
/// structured-data-only instruction appended.
pub fn prompt_for_tier(prompt: &str, tier: Tier) -> Cow<'_, str> {
    match tier.mode() {
        ResponseMode::Strict => Cow::Borrowed(prompt),
        ResponseMode::FreeForm => Cow::Owned(format!("{}\n\n{}", prompt, JSON_ONLY_INSTRUCTION)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_prompt_unchanged() {
        assert_eq!(prompt_for_tier("p", Tier::PremiumStrict), "p");
    }

    #[test]
    fn test_free_form_prompt_has_instruction() {
        let prompt = prompt_for_tier("p", Tier::EconomyFreeForm);
        assert!(prompt.starts_with("p\n\n"));
        assert!(prompt.ends_with(JSON_ONLY_INSTRUCTION));
    }
}
