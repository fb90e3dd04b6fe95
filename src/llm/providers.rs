//! Provider adapters: ASI:One (OpenAI-compatible) and a local Ollama server.

use super::client::{GenerateFuture, GenerationRequest, Generator};
use crate::config::{Config, DEFAULT_ASI1_BASE_URL};
use crate::error::{ProviderError, ProviderResult};
use crate::util::truncate_str;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Maximum length for error bodies carried in `ProviderError::Status`
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Keep credentials out of logged error bodies.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-",
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated.to_string()
}

fn http_client(timeout_secs: u64) -> ProviderResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

fn map_send_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::Http(err)
    }
}

fn validated_base(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(trimmed.to_string())
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

fn messages(request: &GenerationRequest) -> Vec<Message> {
    vec![
        Message {
            role: "system".to_string(),
            content: request.system.clone(),
        },
        Message {
            role: "user".to_string(),
            content: request.user.clone(),
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  ASI:ONE (OpenAI-compatible chat completions)
// ═══════════════════════════════════════════════════════════════════════════

/// How the API key is presented to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthHeader {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `X-API-Key: <key>` (header names are case-insensitive on the wire)
    ApiKey,
}

impl AuthHeader {
    const ALL: [AuthHeader; 2] = [AuthHeader::Bearer, AuthHeader::ApiKey];

    fn label(&self) -> &'static str {
        match self {
            AuthHeader::Bearer => "bearer",
            AuthHeader::ApiKey => "x-api-key",
        }
    }

    fn apply(&self, builder: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder {
        match self {
            AuthHeader::Bearer => builder.bearer_auth(key),
            AuthHeader::ApiKey => builder.header("X-API-Key", key),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null when the provider refuses or errors
    #[serde(default)]
    content: Option<String>,
}

/// One (base URL, auth header) combination for the ASI:One API.
pub struct AsiProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    auth: AuthHeader,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl AsiProvider {
    pub fn new(
        base_url: &str,
        auth: AuthHeader,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> ProviderResult<Self> {
        let base = validated_base(base_url).ok_or(ProviderError::NotConfigured("ASI:One base URL"))?;
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured("ASI:One API key"));
        }
        Ok(Self {
            name: format!("asi1[{}]@{}", auth.label(), base),
            client: http_client(timeout_secs)?,
            endpoint: format!("{}/chat/completions", base),
            auth,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            timeout_secs,
        })
    }

    /// Candidate base URLs, deduplicated, in the order they are tried.
    pub fn candidate_bases(configured: &str) -> Vec<String> {
        let configured = configured.trim().trim_end_matches('/');
        let default_root = DEFAULT_ASI1_BASE_URL.trim_end_matches("/v1");
        let raw = [
            configured,
            configured.strip_suffix("/v1").unwrap_or(configured),
            DEFAULT_ASI1_BASE_URL,
            default_root,
        ];

        let mut bases: Vec<String> = Vec::new();
        for base in raw.into_iter().filter_map(validated_base) {
            if !bases.contains(&base) {
                bases.push(base);
            }
        }
        bases
    }

    /// Every base/header combination for the configured key, in try order.
    pub fn candidates(config: &Config, api_key: &str) -> Vec<Self> {
        let mut out = Vec::new();
        for base in Self::candidate_bases(&config.asi1_base_url) {
            for auth in AuthHeader::ALL {
                match Self::new(&base, auth, api_key, &config.asi1_model, config.request_timeout_secs) {
                    Ok(provider) => out.push(provider),
                    Err(err) => tracing::warn!("skipping ASI:One candidate {}: {}", base, err),
                }
            }
        }
        out
    }

    async fn call(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: messages(request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let builder = self.client.post(&self.endpoint).json(&body);
        let response = self
            .auth
            .apply(builder, &self.api_key)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: sanitize_api_response(&text),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

impl Generator for AsiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(self.call(request))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  OLLAMA (local /api/chat)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Secondary provider backed by a local Ollama server.
pub struct OllamaProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> ProviderResult<Self> {
        let base = validated_base(base_url).ok_or(ProviderError::NotConfigured("Ollama base URL"))?;
        Ok(Self {
            name: format!("ollama[{}]@{}", model, base),
            client: http_client(timeout_secs)?,
            endpoint: format!("{}/api/chat", base),
            model: model.to_string(),
            timeout_secs,
        })
    }

    async fn call(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: messages(request),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: sanitize_api_response(&text),
            });
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&text)?;
        parsed
            .message
            .map(|m| m.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

impl Generator for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(self.call(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::ProviderChain;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    /// What a fake model server saw, and what it answers with.
    #[derive(Clone)]
    struct FakeModel {
        reply: (StatusCode, String),
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
        headers: Arc<Mutex<Vec<HeaderMap>>>,
    }

    impl FakeModel {
        fn answering(status: StatusCode, body: &str) -> Self {
            Self {
                reply: (status, body.to_string()),
                bodies: Arc::default(),
                headers: Arc::default(),
            }
        }

        fn body(&self) -> serde_json::Value {
            self.bodies.lock().unwrap()[0].clone()
        }

        fn header(&self, name: &str) -> Option<String> {
            self.headers.lock().unwrap()[0]
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        }
    }

    async fn serve_fake(model: FakeModel) -> String {
        async fn chat(
            State(model): State<FakeModel>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) -> (StatusCode, String) {
            model.bodies.lock().unwrap().push(body);
            model.headers.lock().unwrap().push(headers);
            model.reply.clone()
        }

        let app = Router::new()
            .route("/v1/chat/completions", post(chat))
            .route("/api/chat", post(chat))
            .with_state(model);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fix_request() -> GenerationRequest {
        GenerationRequest::new("be brief", "main.c:10 missing return", 60, 0.3)
    }

    const COMPLETION: &str = r#"{"choices":[{"message":{"content":"  return 0;  "}}]}"#;

    #[test]
    fn test_candidate_bases_dedupe_and_order() {
        let bases = AsiProvider::candidate_bases("https://api.asi1.ai/v1/");
        assert_eq!(bases, vec!["https://api.asi1.ai/v1", "https://api.asi1.ai"]);

        let bases = AsiProvider::candidate_bases("https://proxy.test/v1");
        assert_eq!(
            bases,
            vec![
                "https://proxy.test/v1",
                "https://proxy.test",
                "https://api.asi1.ai/v1",
                "https://api.asi1.ai",
            ]
        );
    }

    #[test]
    fn test_invalid_configured_base_is_skipped() {
        let bases = AsiProvider::candidate_bases("not a url");
        assert_eq!(bases, vec!["https://api.asi1.ai/v1", "https://api.asi1.ai"]);
    }

    #[test]
    fn test_candidates_cover_every_header_shape() {
        let config = Config::default();
        let providers = AsiProvider::candidates(&config, "sk-test");
        assert_eq!(providers.len(), 4);
        assert_eq!(providers[0].name(), "asi1[bearer]@https://api.asi1.ai/v1");
        assert_eq!(providers[1].name(), "asi1[x-api-key]@https://api.asi1.ai/v1");
        assert_eq!(providers[0].endpoint, "https://api.asi1.ai/v1/chat/completions");
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = AsiProvider::new("https://api.asi1.ai/v1", AuthHeader::Bearer, " ", "m", 5)
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn test_ollama_endpoint() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.2", 5).unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434/api/chat");
        assert!(provider.name().starts_with("ollama"));
        assert!(OllamaProvider::new("ftp://nope", "m", 5).is_err());
    }

    #[test]
    fn test_sanitize_redacts_secrets() {
        assert_eq!(sanitize_api_response("bad model"), "bad model");
        assert!(sanitize_api_response("invalid api_key sk-abc").contains("redacted"));
    }

    #[test]
    fn test_chat_response_with_null_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_asi_call_sends_chat_body_with_bearer() {
        let fake = FakeModel::answering(StatusCode::OK, COMPLETION);
        let base = serve_fake(fake.clone()).await;
        let provider =
            AsiProvider::new(&format!("{}/v1", base), AuthHeader::Bearer, "sk-test", "asi1-mini", 5)
                .unwrap();

        let text = provider.generate(&fix_request()).await.unwrap();
        assert_eq!(text, "return 0;");

        let body = fake.body();
        assert_eq!(body["model"], "asi1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 60);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(fake.header("authorization").as_deref(), Some("Bearer sk-test"));
        assert_eq!(fake.header("x-api-key"), None);
    }

    #[tokio::test]
    async fn test_asi_call_with_api_key_header() {
        let fake = FakeModel::answering(StatusCode::OK, COMPLETION);
        let base = serve_fake(fake.clone()).await;
        let provider =
            AsiProvider::new(&format!("{}/v1", base), AuthHeader::ApiKey, "sk-test", "m", 5).unwrap();

        provider.generate(&fix_request()).await.unwrap();
        assert_eq!(fake.header("x-api-key").as_deref(), Some("sk-test"));
        assert_eq!(fake.header("authorization"), None);
    }

    #[tokio::test]
    async fn test_asi_error_status_is_sanitized() {
        let fake = FakeModel::answering(StatusCode::INTERNAL_SERVER_ERROR, "invalid api_key sk-123");
        let base = serve_fake(fake).await;
        let provider =
            AsiProvider::new(&format!("{}/v1", base), AuthHeader::Bearer, "sk-test", "m", 5).unwrap();

        match provider.generate(&fix_request()).await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("redacted"));
                assert!(!body.contains("sk-123"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_asi_null_content_is_empty_response() {
        let fake = FakeModel::answering(StatusCode::OK, r#"{"choices":[{"message":{"content":null}}]}"#);
        let base = serve_fake(fake).await;
        let provider =
            AsiProvider::new(&format!("{}/v1", base), AuthHeader::Bearer, "sk-test", "m", 5).unwrap();

        let err = provider.generate(&fix_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_ollama_call_sends_non_streaming_options() {
        let fake = FakeModel::answering(StatusCode::OK, r#"{"message":{"role":"assistant","content":" add a guard "}}"#);
        let base = serve_fake(fake.clone()).await;
        let provider = OllamaProvider::new(&base, "llama3.2", 5).unwrap();

        let text = provider.generate(&fix_request()).await.unwrap();
        assert_eq!(text, "add a guard");

        let body = fake.body();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 60);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(body["messages"][1]["content"], "main.c:10 missing return");
        assert!(body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_chain_moves_from_failing_asi_to_ollama() {
        let asi_fake = FakeModel::answering(StatusCode::INTERNAL_SERVER_ERROR, "upstream down");
        let ollama_fake = FakeModel::answering(StatusCode::OK, r#"{"message":{"content":"check for None"}}"#);
        let asi_base = serve_fake(asi_fake.clone()).await;
        let ollama_base = serve_fake(ollama_fake.clone()).await;

        let chain = ProviderChain::new(vec![
            Arc::new(
                AsiProvider::new(&format!("{}/v1", asi_base), AuthHeader::Bearer, "sk-test", "m", 5)
                    .unwrap(),
            ) as Arc<dyn Generator>,
            Arc::new(OllamaProvider::new(&ollama_base, "llama3.2", 5).unwrap()),
        ]);

        let text = chain.generate(&fix_request()).await;
        assert_eq!(text.as_deref(), Some("check for None"));
        assert_eq!(asi_fake.bodies.lock().unwrap().len(), 1);
        assert_eq!(ollama_fake.bodies.lock().unwrap().len(), 1);
    }
}
