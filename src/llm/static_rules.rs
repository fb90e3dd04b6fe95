//! Static rule-based fixes (used when no provider answers)
//!
//! An ordered list of substring rules over the lowercased message. Order is
//! priority: messages often match several rules and the first one wins.

use super::prompts::PromptStyle;
use crate::triage::Finding;
use crate::util::collapse_whitespace;
use tracing::debug;

/// Category of a deterministic fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixRule {
    DivisionByZero,
    MissingReturn,
    LinkError,
    MissingModule,
    ImportName,
    NullDereference,
    UndefinedSymbol,
    TypeMismatch,
    Assertion,
    /// Nothing more specific matched.
    CatchAll,
}

/// Rules in priority order. `CatchAll` is implied after the last entry.
pub const RULE_PRIORITY: [FixRule; 9] = [
    FixRule::DivisionByZero,
    FixRule::MissingReturn,
    FixRule::LinkError,
    FixRule::MissingModule,
    FixRule::ImportName,
    FixRule::NullDereference,
    FixRule::UndefinedSymbol,
    FixRule::TypeMismatch,
    FixRule::Assertion,
];

impl FixRule {
    /// Lowercase substrings that select this rule.
    pub fn needles(&self) -> &'static [&'static str] {
        match self {
            FixRule::DivisionByZero => &["division by zero", "divide by zero", "zerodivisionerror"],
            FixRule::MissingReturn => &["control reaches end of non-void function", "missing return"],
            FixRule::LinkError => &["undefined reference", "ld returned 1 exit status", "linker"],
            FixRule::MissingModule => &["modulenotfounderror", "no module named", "cannot find module"],
            FixRule::ImportName => &["importerror", "cannot import name"],
            FixRule::NullDereference => &[
                "nonetype",
                "null pointer",
                "nullptr",
                "cannot read properties of undefined",
                "cannot read properties of null",
                "segmentation fault",
            ],
            FixRule::UndefinedSymbol => &[
                "not defined",
                "nameerror",
                "was not declared",
                "undeclared identifier",
                "cannot find name",
            ],
            FixRule::TypeMismatch => &[
                "type mismatch",
                "cannot convert",
                "is not assignable to type",
                "typeerror",
                "incompatible type",
            ],
            FixRule::Assertion => &["assert", "failed"],
            FixRule::CatchAll => &[],
        }
    }

    pub fn tip(&self) -> &'static str {
        match self {
            FixRule::DivisionByZero => "guard the divisor (if d == 0 { handle it } before dividing)",
            FixRule::MissingReturn => "add a return on all paths (e.g., return <value>;)",
            FixRule::LinkError => "link missing object/library or provide the definition",
            FixRule::MissingModule => {
                "the module is not installed; install it (pip install <pkg> / npm install <pkg>) or fix the import path"
            }
            FixRule::ImportName => "import a name the module actually exports, or check for a circular import",
            FixRule::NullDereference => "check for null/None before using the value",
            FixRule::UndefinedSymbol => "define/import the symbol before use",
            FixRule::TypeMismatch => "adjust the type/cast or the function signature",
            FixRule::Assertion => "update precondition or fix logic to satisfy the assertion",
            FixRule::CatchAll => "fix the first reported error; later ones cascade",
        }
    }

    /// Playful lead-in placed before the tip.
    pub fn roast(&self) -> &'static str {
        match self {
            FixRule::DivisionByZero => "dividing by zero is not a personality. ",
            FixRule::MissingReturn => "function ghosted its caller. ",
            FixRule::LinkError => "the linker can't find your homework. ",
            FixRule::MissingModule => "importing vibes, not packages. ",
            FixRule::ImportName => "that name isn't on the guest list. ",
            FixRule::NullDereference => "you poked a null and it poked back. ",
            FixRule::UndefinedSymbol => "using it before it exists, bold. ",
            FixRule::TypeMismatch => "types are not a suggestion. ",
            FixRule::Assertion => "the test said no. ",
            FixRule::CatchAll => "",
        }
    }

    /// Substring groups that select this rule only when every member appears.
    pub fn all_of(&self) -> &'static [&'static [&'static str]] {
        match self {
            FixRule::NullDereference => &[&["attributeerror", "none"]],
            _ => &[],
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.needles().iter().any(|needle| lowered.contains(needle))
            || self
                .all_of()
                .iter()
                .any(|group| group.iter().all(|needle| lowered.contains(needle)))
    }
}

/// First rule in priority order whose substrings appear in `message`.
pub fn classify_message(message: &str) -> FixRule {
    let lowered = message.to_lowercase();
    RULE_PRIORITY
        .into_iter()
        .find(|rule| rule.matches(&lowered))
        .unwrap_or(FixRule::CatchAll)
}

/// Deterministic one-line fix for the top finding.
pub fn fallback_fix(finding: &Finding, style: PromptStyle) -> String {
    let rule = classify_message(&finding.message);
    debug!(rule = ?rule, "static fix rule");

    let roast = match style {
        PromptStyle::Playful => rule.roast(),
        PromptStyle::Neutral => "",
    };
    let body = format!("{}{}", roast, rule.tip());
    collapse_whitespace(&with_location(finding, &body))
}

/// Prefix `file:line — ` unless the text already names the location or
/// the finding has no real location.
pub fn with_location(finding: &Finding, text: &str) -> String {
    if finding.is_unknown() {
        return text.to_string();
    }
    let location = finding.location();
    if mentions_location(text, &location) {
        text.to_string()
    } else {
        format!("{} — {}", location, text)
    }
}

/// `main.c:1` is mentioned by `main.c:1:` but not by `main.c:12`.
fn mentions_location(text: &str, location: &str) -> bool {
    text.match_indices(location).any(|(start, _)| {
        !text[start + location.len()..].starts_with(|c: char| c.is_ascii_digit())
    })
}
