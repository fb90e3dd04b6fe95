use super::Finding;

/// Coarse language family inferred from file extensions.
///
/// "Unknown" is represented as `None` at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageTag {
    /// C, C++ and headers.
    CFamily,
    Python,
    /// TypeScript and JavaScript.
    TypeScript,
}

const C_FAMILY_SUFFIXES: &[&str] = &[".cpp", ".cc", ".cxx", ".hpp", ".h", ".c"];
const PYTHON_SUFFIXES: &[&str] = &[".py"];
const TYPESCRIPT_SUFFIXES: &[&str] = &[".ts", ".tsx", ".js", ".jsx"];

impl LanguageTag {
    pub fn label(&self) -> &'static str {
        match self {
            LanguageTag::CFamily => "cpp",
            LanguageTag::Python => "python",
            LanguageTag::TypeScript => "typescript",
        }
    }

    /// Human-facing name used in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            LanguageTag::CFamily => "C/C++",
            LanguageTag::Python => "Python",
            LanguageTag::TypeScript => "TypeScript/JavaScript",
        }
    }

    fn suffixes(&self) -> &'static [&'static str] {
        match self {
            LanguageTag::CFamily => C_FAMILY_SUFFIXES,
            LanguageTag::Python => PYTHON_SUFFIXES,
            LanguageTag::TypeScript => TYPESCRIPT_SUFFIXES,
        }
    }

    /// Match a file name against the known suffix groups.
    pub fn from_file_name(file: &str) -> Option<Self> {
        let lower = file.to_lowercase();
        [
            LanguageTag::CFamily,
            LanguageTag::Python,
            LanguageTag::TypeScript,
        ]
        .into_iter()
        .find(|tag| tag.suffixes().iter().any(|s| lower.ends_with(s)))
    }

    /// Parse a caller-supplied hint such as `"cpp"` or `"ts"`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_lowercase().as_str() {
            "cpp" | "c" | "c++" | "cxx" => Some(LanguageTag::CFamily),
            "python" | "py" => Some(LanguageTag::Python),
            "typescript" | "ts" | "javascript" | "js" => Some(LanguageTag::TypeScript),
            _ => None,
        }
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tag of the first finding whose file has a recognised extension.
pub fn classify(findings: &[Finding]) -> Option<LanguageTag> {
    findings
        .iter()
        .find_map(|f| LanguageTag::from_file_name(&f.file))
}

/// A recognised hint wins; otherwise classify from the findings.
pub fn resolve_language(hint: Option<&str>, findings: &[Finding]) -> Option<LanguageTag> {
    hint.and_then(LanguageTag::from_hint)
        .or_else(|| classify(findings))
}
