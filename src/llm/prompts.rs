use crate::triage::{Finding, LanguageTag};

/// Register used for generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Terse, a little rude, meme-literate.
    #[default]
    Playful,
    /// Plain and professional.
    Neutral,
}

pub const PING_SYSTEM: &str = "Reply 'pong' only.";

const FIX_SYSTEM_NEUTRAL: &str = "Return a single line of code or a minimal statement that fixes the error. No preface, no prose, no markdown.";

const FIX_SYSTEM_PLAYFUL: &str = "You are Chaos Reviewer, a blunt build-log reviewer. Return a single line of code or a minimal statement that fixes the error. No preface, no prose, no markdown. Attitude is allowed in tone only, never at the cost of correctness.";

const EXPLAIN_SYSTEM_NEUTRAL: &str = "Explain the cause of a build or test error to a developer in two to three plain sentences. Say what went wrong and why the fix works. No code blocks, no lists, no headings.";

const EXPLAIN_SYSTEM_PLAYFUL: &str = "You are Chaos Reviewer, a blunt build-log reviewer with internet-brained humor. Explain the cause of the error in two to three short sentences: what went wrong and why the fix works. Keep it accurate. No code blocks, no lists, no headings.";

pub fn fix_system(style: PromptStyle) -> &'static str {
    match style {
        PromptStyle::Playful => FIX_SYSTEM_PLAYFUL,
        PromptStyle::Neutral => FIX_SYSTEM_NEUTRAL,
    }
}

pub fn explain_system(style: PromptStyle) -> &'static str {
    match style {
        PromptStyle::Playful => EXPLAIN_SYSTEM_PLAYFUL,
        PromptStyle::Neutral => EXPLAIN_SYSTEM_NEUTRAL,
    }
}

/// User prompt for the one-line fix. Only the top finding is sent.
pub fn fix_user_prompt(finding: &Finding, language: Option<LanguageTag>) -> String {
    format!(
        "Suggest a single-line code change for this error. \
         Return ONLY the code change line or the minimal statement (no explanations).\n\
         Error: {}\n\
         File:  {}\n\
         Language: {}\n\
         If a one-liner isn't possible, return: Add a failing test for this case first.",
        finding.message,
        location_for_prompt(finding),
        language_for_prompt(language),
    )
}

/// User prompt for the short explanation.
pub fn explain_user_prompt(finding: &Finding, language: Option<LanguageTag>) -> String {
    format!(
        "Explain this error in two to three sentences.\n\
         Error: {}\n\
         File:  {}\n\
         Language: {}",
        finding.message,
        location_for_prompt(finding),
        language_for_prompt(language),
    )
}

fn location_for_prompt(finding: &Finding) -> String {
    if finding.is_unknown() {
        "not reported".to_string()
    } else {
        finding.location()
    }
}

fn language_for_prompt(language: Option<LanguageTag>) -> &'static str {
    language.map(|l| l.display_name()).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_prompt_contains_only_top_finding_context() {
        let finding = Finding::new("main.c", 10, "control reaches end of non-void function");
        let prompt = fix_user_prompt(&finding, Some(LanguageTag::CFamily));
        assert!(prompt.contains("main.c:10"));
        assert!(prompt.contains("control reaches end"));
        assert!(prompt.contains("C/C++"));
    }

    #[test]
    fn test_unknown_location_is_not_leaked_into_prompt() {
        let finding = Finding::unknown("tests failed");
        let prompt = explain_user_prompt(&finding, None);
        assert!(!prompt.contains("(unknown)"));
        assert!(prompt.contains("Language: unknown"));
    }

    #[test]
    fn test_styles_use_different_system_text() {
        assert_ne!(
            fix_system(PromptStyle::Playful),
            fix_system(PromptStyle::Neutral)
        );
        assert_ne!(
            explain_system(PromptStyle::Playful),
            explain_system(PromptStyle::Neutral)
        );
    }
}
