//! Turn handling: intent short-circuits, envelope detection, and the
//! two-part reply (fix + explanation; closing remark).

use crate::llm::{compose_explanation, compose_fix, PromptStyle, ProviderChain};
use crate::quips::RemarkSelector;
use crate::triage::{extract_text, resolve_language, Finding, LanguageTag};
use crate::util::truncate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

pub const SUCCESS_LINE: &str = "GG. Ship it before it breaks again.";
pub const PRAISE_LINE: &str = "flattery noted. now go fix the next one.";
pub const PROVIDE_ERROR_LINE: &str = "skip the small talk and paste the error.";
pub const NEED_ERROR_LINE: &str = "that log has no error in it. paste the part that actually failed.";
pub const SESSION_GREETING: &str =
    "Hey! I'm Chaos Reviewer. Paste an error or ask for a quick code note.";

/// Whole-message "it works now" phrasings.
static SUCCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(return\s+[01]\s*;?|gg\s*king|build\s+passe[sd]|tests?\s+pass(ed|es)?|fixed(\s+it)?|it\s+works(\s+now)?|works(\s+now)?|all\s+green|ok(\s+now)?)\s*[.!]*\s*$",
    )
    .expect("success pattern is valid")
});

static PRAISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(thanks|thank\s*you|ty|appreciate|you(\s*are|'re)?\s+(good|great|amazing|awesome|goat|goated))\b",
    )
    .expect("praise pattern is valid")
});

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(hi|hello|hey|yo|sup|hola|namaste|what'?s\s+up|gm|good\s+(morning|afternoon|evening))\b",
    )
    .expect("greeting pattern is valid")
});

/// What a message looks like before any extraction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    DeclaredSuccess,
    Praise,
    Greeting,
    Other,
}

impl Intent {
    pub fn classify(text: &str) -> Self {
        if SUCCESS_RE.is_match(text) {
            Intent::DeclaredSuccess
        } else if PRAISE_RE.is_match(text) {
            Intent::Praise
        } else if GREETING_RE.is_match(text) {
            Intent::Greeting
        } else {
            Intent::Other
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub lang: Option<String>,
}

/// Structured request as sent by the bridge, the webhook, or pasted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundRequest {
    pub context: Option<RequestContext>,
    pub log_tail: Option<String>,
    pub text: Option<String>,
    pub ts: Option<i64>,
}

impl InboundRequest {
    pub fn lang_hint(&self) -> Option<&str> {
        self.context.as_ref()?.lang.as_deref()
    }

    /// Trimmed `log_tail`, if it has any content.
    pub fn log_tail(&self) -> Option<&str> {
        non_blank(self.log_tail.as_deref())
    }

    /// Trimmed `text`, if it has any content.
    pub fn free_text(&self) -> Option<&str> {
        non_blank(self.text.as_deref())
    }

    /// Parse chat text as an envelope. Only JSON objects carrying
    /// `log_tail` or `text` count; everything else is plain text.
    pub fn from_chat_text(text: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        let object = value.as_object()?;
        if !object.contains_key("log_tail") && !object.contains_key("text") {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(request) => Some(request),
            Err(err) => {
                debug!("envelope-shaped JSON did not decode, treating as text: {}", err);
                None
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reply written back by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub ts: i64,
    pub lines: [String; 2],
}

/// The two segments of one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    /// Fix line, optionally followed by `\nSolution: ...`.
    pub part_one: String,
    /// Closing remark, verbatim from the quip tables.
    pub part_two: String,
}

impl ReplyEnvelope {
    pub fn lines(&self) -> [&str; 2] {
        [&self.part_one, &self.part_two]
    }

    pub fn into_lines(self) -> [String; 2] {
        [self.part_one, self.part_two]
    }
}

/// Turns inbound text into replies. One instance serves every turn.
pub struct Reviewer {
    chain: ProviderChain,
    style: PromptStyle,
    remarks: Mutex<RemarkSelector>,
}

impl Reviewer {
    pub fn new(chain: ProviderChain, style: PromptStyle) -> Self {
        Self::with_selector(chain, style, RemarkSelector::from_entropy())
    }

    pub fn with_selector(chain: ProviderChain, style: PromptStyle, selector: RemarkSelector) -> Self {
        Self {
            chain,
            style,
            remarks: Mutex::new(selector),
        }
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    pub fn session_greeting(&self) -> &'static str {
        SESSION_GREETING
    }

    /// Reply to one chat message. Blank text is ignored.
    pub async fn respond(&self, text: &str) -> Option<ReplyEnvelope> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let span = info_span!("turn", id = %Uuid::new_v4());
        Some(self.route(text).instrument(span).await)
    }

    /// Reply to an already-decoded envelope.
    pub async fn respond_request(&self, request: &InboundRequest) -> ReplyEnvelope {
        let span = info_span!("turn", id = %Uuid::new_v4());
        self.route_envelope(request, "").instrument(span).await
    }

    async fn route(&self, text: &str) -> ReplyEnvelope {
        if let Some(reply) = self.short_circuit(text) {
            return reply;
        }
        match InboundRequest::from_chat_text(text) {
            Some(request) => self.route_envelope(&request, text).await,
            None => self.triage_or_prompt(text).await,
        }
    }

    async fn route_envelope(&self, request: &InboundRequest, raw: &str) -> ReplyEnvelope {
        if let Some(log) = request.log_tail() {
            let findings = extract_text(log);
            if findings.is_empty() {
                info!("envelope log has no findings");
                return self.fixed(NEED_ERROR_LINE);
            }
            let language = resolve_language(request.lang_hint(), &findings);
            return self.pipeline(&findings, language).await;
        }
        if let Some(text) = request.free_text() {
            if let Some(reply) = self.short_circuit(text) {
                return reply;
            }
            return self.triage_or_prompt(text).await;
        }
        self.triage_or_prompt(raw).await
    }

    /// Success and praise skip extraction entirely.
    fn short_circuit(&self, text: &str) -> Option<ReplyEnvelope> {
        match Intent::classify(text) {
            Intent::DeclaredSuccess => {
                info!("declared success");
                Some(self.fixed(SUCCESS_LINE))
            }
            Intent::Praise => {
                info!("praise");
                Some(self.fixed(PRAISE_LINE))
            }
            Intent::Greeting | Intent::Other => None,
        }
    }

    async fn triage_or_prompt(&self, text: &str) -> ReplyEnvelope {
        let findings = extract_text(text);
        if !findings.is_empty() {
            let language = resolve_language(None, &findings);
            return self.pipeline(&findings, language).await;
        }
        let intent = Intent::classify(text);
        info!(intent = ?intent, "no findings; asking for the error");
        self.fixed(PROVIDE_ERROR_LINE)
    }

    async fn pipeline(&self, findings: &[Finding], language: Option<LanguageTag>) -> ReplyEnvelope {
        let Some(top) = findings.first() else {
            return self.fixed(PROVIDE_ERROR_LINE);
        };
        info!(
            findings = findings.len(),
            language = language.map(|l| l.label()).unwrap_or("unknown"),
            top = %truncate(&top.to_string(), 160),
            "triaging"
        );

        let (fix, explanation) = futures::join!(
            compose_fix(&self.chain, self.style, findings, language),
            compose_explanation(&self.chain, self.style, findings, language),
        );

        let part_one = match explanation {
            Some(explanation) => format!("{}\nSolution: {}", fix, explanation),
            None => fix,
        };
        ReplyEnvelope {
            part_one,
            part_two: self.remark(language, top.is_unknown()),
        }
    }

    fn fixed(&self, line: &str) -> ReplyEnvelope {
        ReplyEnvelope {
            part_one: line.to_string(),
            part_two: self.remark(None, false),
        }
    }

    fn remark(&self, language: Option<LanguageTag>, basic: bool) -> String {
        self.remarks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .select(language, basic)
            .to_string()
    }
}
