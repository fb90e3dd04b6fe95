//! One-line fix: ask the provider chain first, then fall back to the
//! static rule table.

use super::client::{GenerationRequest, ProviderChain};
use super::prompts::{fix_system, fix_user_prompt, PromptStyle};
use super::static_rules::{fallback_fix, with_location, FixRule};
use crate::triage::{Finding, LanguageTag};
use crate::util::collapse_whitespace;
use tracing::debug;

pub const FIX_MAX_TOKENS: u32 = 60;
pub const FIX_TEMPERATURE: f32 = 0.3;

/// Produce the fix line for `findings[0]`. Never fails.
pub async fn compose_fix(
    chain: &ProviderChain,
    style: PromptStyle,
    findings: &[Finding],
    language: Option<LanguageTag>,
) -> String {
    let Some(top) = findings.first() else {
        return FixRule::CatchAll.tip().to_string();
    };

    let request = GenerationRequest::new(
        fix_system(style),
        fix_user_prompt(top, language),
        FIX_MAX_TOKENS,
        FIX_TEMPERATURE,
    );

    if let Some(raw) = chain.generate(&request).await {
        if let Some(line) = clean_fix_line(&raw) {
            return with_location(top, &line);
        }
        debug!("generated fix was unusable after cleanup");
    }

    fallback_fix(top, style)
}

/// First non-empty line of a model reply, with code fences and backticks
/// removed. `None` when nothing usable is left.
pub fn clean_fix_line(raw: &str) -> Option<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .map(|line| collapse_whitespace(&line.replace('`', "")))
        .find(|line| !line.is_empty())
}
