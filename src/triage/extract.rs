//! Finding extraction.
//!
//! Three structured matchers are tried in a fixed order and the first one that
//! produces anything wins outright; formats are never merged. When none match,
//! a keyword scan over the tail of the log picks up error-looking lines.

use super::Finding;
use crate::util::collapse_whitespace;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Upper bound on findings taken from a structured matcher.
pub const MAX_STRUCTURED_FINDINGS: usize = 5;
/// Upper bound on findings taken from the keyword fallback.
pub const MAX_FALLBACK_FINDINGS: usize = 3;
/// The keyword fallback only looks at this many trailing lines.
const FALLBACK_TAIL_LINES: usize = 300;

const FALLBACK_KEYWORDS: [&str; 3] = ["error", "assertionerror", "failed"];

static COMPILER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?P<file>[^:\n]+):(?P<line>\d+):\d*:?\s*error:\s*(?P<msg>.+)$")
        .expect("compiler diagnostic regex")
});

static TRACEBACK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"File "(?P<file>[^"]+)", line (?P<line>\d+)"#).expect("traceback header regex")
});

/// A line such as `ValueError: bad value` closes a frame's message block.
static TRACEBACK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\w.*:").expect("traceback terminator regex"));

static TSC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?P<file>[^:\n]+)\((?P<line>\d+),\d+\):\s*error\s+TS\d+:\s*(?P<msg>.+)$")
        .expect("tsc diagnostic regex")
});

/// One diagnostic format family.
pub trait DiagnosticMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Findings in text order, at most `limit` of them.
    fn scan(&self, text: &str, limit: usize) -> Vec<Finding>;
}

/// `path:line[:col]: error: message` (gcc, clang, many linters).
#[derive(Debug, Default, Clone, Copy)]
pub struct CompilerMatcher;

/// Python tracebacks: `File "path", line N` followed by the frame's text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracebackMatcher;

/// `path(line,col): error TSxxxx: message` (TypeScript compiler).
#[derive(Debug, Default, Clone, Copy)]
pub struct TscMatcher;

impl DiagnosticMatcher for CompilerMatcher {
    fn name(&self) -> &'static str {
        "compiler"
    }

    fn scan(&self, text: &str, limit: usize) -> Vec<Finding> {
        scan_single_line(&COMPILER_RE, text, limit)
    }
}

impl DiagnosticMatcher for TscMatcher {
    fn name(&self) -> &'static str {
        "tsc"
    }

    fn scan(&self, text: &str, limit: usize) -> Vec<Finding> {
        scan_single_line(&TSC_RE, text, limit)
    }
}

impl DiagnosticMatcher for TracebackMatcher {
    fn name(&self) -> &'static str {
        "traceback"
    }

    fn scan(&self, text: &str, limit: usize) -> Vec<Finding> {
        let headers: Vec<_> = TRACEBACK_HEADER_RE.captures_iter(text).collect();
        let mut findings = Vec::new();

        for (idx, caps) in headers.iter().enumerate() {
            if findings.len() >= limit {
                break;
            }
            let Some(whole) = caps.get(0) else { continue };
            let Some((file, line)) = file_and_line(caps) else {
                continue;
            };

            // The frame body starts on the line after the header and runs
            // until a `word...:` line, the next header or the end of the text.
            let body_start = text[whole.end()..]
                .find('\n')
                .map(|offset| whole.end() + offset + 1)
                .unwrap_or(text.len());
            let body_end = headers
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map(|next| line_start(text, next.start()))
                .unwrap_or(text.len());

            let body = if body_start < body_end {
                &text[body_start..body_end]
            } else {
                ""
            };
            let body: Vec<&str> = body
                .lines()
                .take_while(|l| !TRACEBACK_END_RE.is_match(l))
                .collect();
            let mut message = collapse_whitespace(&body.join("\n"));
            if message.is_empty() {
                message = collapse_whitespace(whole.as_str());
            }

            findings.push(Finding::new(file, line, message));
        }

        findings
    }
}

/// Matchers in priority order.
pub fn default_matchers() -> [&'static dyn DiagnosticMatcher; 3] {
    [&CompilerMatcher, &TracebackMatcher, &TscMatcher]
}

/// Extract findings from raw log text. `None` and empty input give nothing.
pub fn extract(text: Option<&str>) -> Vec<Finding> {
    match text {
        Some(text) => extract_text(text),
        None => Vec::new(),
    }
}

/// Extract findings from raw log text.
pub fn extract_text(text: &str) -> Vec<Finding> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    for matcher in default_matchers() {
        let findings = matcher.scan(text, MAX_STRUCTURED_FINDINGS);
        if !findings.is_empty() {
            debug!(
                matcher = matcher.name(),
                count = findings.len(),
                "structured findings"
            );
            return findings;
        }
    }

    let findings = keyword_fallback(text);
    debug!(count = findings.len(), "keyword fallback findings");
    findings
}

/// Scan the last lines of `text` for anything that smells like a failure.
pub fn keyword_fallback(text: &str) -> Vec<Finding> {
    let lines: Vec<&str> = text.lines().collect();
    let tail_start = lines.len().saturating_sub(FALLBACK_TAIL_LINES);

    lines[tail_start..]
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            FALLBACK_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .take(MAX_FALLBACK_FINDINGS)
        .map(Finding::unknown)
        .collect()
}

fn scan_single_line(re: &Regex, text: &str, limit: usize) -> Vec<Finding> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let (file, line) = file_and_line(&caps)?;
            let message = caps
                .name("msg")
                .map(|m| collapse_whitespace(m.as_str()))
                .unwrap_or_default();
            let message = if message.is_empty() {
                collapse_whitespace(caps.get(0)?.as_str())
            } else {
                message
            };
            Some(Finding::new(file, line, message))
        })
        .take(limit)
        .collect()
}

/// Pull a non-empty file and a positive line number out of a match.
fn file_and_line(caps: &regex::Captures<'_>) -> Option<(String, u32)> {
    let file = caps.name("file")?.as_str().trim();
    if file.is_empty() {
        return None;
    }
    let line: u32 = caps.name("line")?.as_str().parse().ok()?;
    if line == 0 {
        return None;
    }
    Some((file.to_string(), line))
}

fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}
