//! Short natural-language explanation of the top finding.

use super::client::{GenerationRequest, ProviderChain};
use super::prompts::{explain_system, explain_user_prompt, PromptStyle};
use crate::triage::{Finding, LanguageTag};
use crate::util::collapse_whitespace;

pub const EXPLAIN_MAX_TOKENS: u32 = 160;
pub const EXPLAIN_TEMPERATURE: f32 = 0.4;
/// Hard cap on explanation length, in characters.
pub const MAX_EXPLANATION_CHARS: usize = 350;

/// Explanation for `findings[0]`, or `None` when no provider answered.
pub async fn compose_explanation(
    chain: &ProviderChain,
    style: PromptStyle,
    findings: &[Finding],
    language: Option<LanguageTag>,
) -> Option<String> {
    let top = findings.first()?;
    let request = GenerationRequest::new(
        explain_system(style),
        explain_user_prompt(top, language),
        EXPLAIN_MAX_TOKENS,
        EXPLAIN_TEMPERATURE,
    );
    let raw = chain.generate(&request).await?;
    normalize_explanation(&raw)
}

/// Collapse whitespace and cut to [`MAX_EXPLANATION_CHARS`], adding `…`
/// when something was dropped.
pub fn normalize_explanation(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return None;
    }
    match text.char_indices().nth(MAX_EXPLANATION_CHARS) {
        Some((cut, _)) => Some(format!("{}…", text[..cut].trim_end())),
        None => Some(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::testing::ScriptedGenerator;
    use crate::llm::client::Generator;
    use std::sync::Arc;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(
            normalize_explanation("The divisor\n\n  is zero.").as_deref(),
            Some("The divisor is zero.")
        );
        assert_eq!(normalize_explanation(" \n "), None);
    }

    #[test]
    fn test_normalize_truncates_long_text() {
        let long = "word ".repeat(200);
        let out = normalize_explanation(&long).unwrap();
        assert!(out.ends_with('…'));
        assert!(out.chars().count() <= MAX_EXPLANATION_CHARS + 1);
    }

    #[test]
    fn test_normalize_keeps_text_at_limit() {
        let exact = "a".repeat(MAX_EXPLANATION_CHARS);
        assert_eq!(normalize_explanation(&exact), Some(exact));
    }

    #[tokio::test]
    async fn test_offline_has_no_explanation() {
        let findings = vec![Finding::new("a.py", 1, "boom")];
        let out =
            compose_explanation(&ProviderChain::offline(), PromptStyle::Neutral, &findings, None).await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn test_generated_explanation() {
        let chain = ProviderChain::new(vec![Arc::new(ScriptedGenerator::new(
            "fake",
            vec![Some("You divided by zero.\nGuard it.")],
        )) as Arc<dyn Generator>]);
        let findings = vec![Finding::new("a.py", 1, "ZeroDivisionError")];
        let out = compose_explanation(&chain, PromptStyle::Neutral, &findings, None).await;
        assert_eq!(out.as_deref(), Some("You divided by zero. Guard it."));
    }
}
