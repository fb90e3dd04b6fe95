//! Log triage: pull structured findings out of raw build/test output and
//! guess which language family produced them.

pub mod extract;
pub mod language;

pub use extract::{
    extract, extract_text, keyword_fallback, CompilerMatcher, DiagnosticMatcher,
    TracebackMatcher, TscMatcher, MAX_FALLBACK_FINDINGS, MAX_STRUCTURED_FINDINGS,
};
pub use language::{classify, resolve_language, LanguageTag};

/// File name used for findings that came from the keyword fallback.
pub const UNKNOWN_FILE: &str = "(unknown)";

/// One extracted diagnostic: where it points and what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: String,
    /// Always >= 1.
    pub line: u32,
    /// Single line, whitespace collapsed.
    pub message: String,
}

impl Finding {
    pub fn new(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Finding produced by the keyword scan rather than a structured matcher.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(UNKNOWN_FILE, 1, message)
    }

    /// True when no real file/line signal was found.
    pub fn is_unknown(&self) -> bool {
        self.file == UNKNOWN_FILE
    }

    /// `file:line`, as shown to the user.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_format() {
        let finding = Finding::new("main.c", 10, "boom");
        assert_eq!(finding.location(), "main.c:10");
        assert_eq!(finding.to_string(), "main.c:10: boom");
    }

    #[test]
    fn test_unknown_finding() {
        let finding = Finding::unknown("tests failed");
        assert!(finding.is_unknown());
        assert_eq!(finding.line, 1);
        assert!(!Finding::new("a.py", 3, "x").is_unknown());
    }
}
