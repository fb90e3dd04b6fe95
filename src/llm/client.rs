//! Generation oracle: an ordered chain of provider adapters.
//!
//! Each adapter turns (system, user, budget) into text or an error. The chain
//! tries them once each, in order, and stops at the first usable answer.
//! Errors never leave the chain; they are logged and count as "no result".

use super::providers::{AsiProvider, OllamaProvider};
use crate::config::Config;
use crate::error::ProviderResult;
use crate::util::{mask_tail, truncate_str};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Future returned by [`Generator::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>>;

/// A single stateless completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens,
            temperature,
        }
    }
}

/// One way of reaching a text-generation backend.
pub trait Generator: Send + Sync {
    /// Short label for logs, e.g. `asi1[bearer]@https://api.asi1.ai/v1`.
    fn name(&self) -> &str;

    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a>;
}

/// Text produced by the chain, tagged with the adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub provider: String,
    pub text: String,
}

/// Ordered provider adapters with early exit on the first success.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn Generator>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn Generator>>) -> Self {
        Self { providers }
    }

    /// A chain with no providers: every call returns `None`.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Primary ASI:One adapters (one per base URL and auth header shape),
    /// then the local Ollama adapter when configured.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Arc<dyn Generator>> = Vec::new();

        match config.api_key() {
            Some(key) => {
                info!(
                    "ASI:One key present (len={} tail={}) | model={}",
                    key.chars().count(),
                    mask_tail(&key, 6),
                    config.asi1_model
                );
                for provider in AsiProvider::candidates(config, &key) {
                    providers.push(Arc::new(provider));
                }
            }
            None => info!("no ASI1_API_KEY set; primary provider disabled"),
        }

        if let Some(base) = &config.ollama_base_url {
            match OllamaProvider::new(base, &config.ollama_model, config.request_timeout_secs) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(err) => warn!("ignoring Ollama provider: {}", err),
            }
        }

        if providers.is_empty() {
            info!("no generation providers configured; using built-in fixes only");
        }
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// First non-empty answer from the chain, or `None`.
    pub async fn generate(&self, request: &GenerationRequest) -> Option<String> {
        self.generate_with_source(request).await.map(|g| g.text)
    }

    /// Like [`generate`](Self::generate), but reports which adapter answered.
    pub async fn generate_with_source(&self, request: &GenerationRequest) -> Option<Generated> {
        for provider in &self.providers {
            let start = Instant::now();
            match provider.generate(request).await {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        warn!(provider = provider.name(), "empty response");
                        continue;
                    }
                    debug!(
                        provider = provider.name(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "generation succeeded"
                    );
                    return Some(Generated {
                        provider: provider.name().to_string(),
                        text: text.to_string(),
                    });
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "generation failed: {}",
                        truncate_str(&err.to_string(), 240)
                    );
                }
            }
        }
        None
    }

    /// Round-trip a trivial prompt to see whether any provider answers.
    pub async fn ping(&self) -> Option<Generated> {
        let request = GenerationRequest::new(super::prompts::PING_SYSTEM, "ping", 4, 0.0);
        self.generate_with_source(&request).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new("system", "user", 60, 0.3)
    }

    #[tokio::test]
    async fn test_offline_chain_returns_none() {
        let chain = ProviderChain::offline();
        assert!(chain.is_empty());
        assert_eq!(chain.generate(&request()).await, None);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let primary = Arc::new(ScriptedGenerator::new("primary", vec![Some("  fixed  ")]));
        let secondary = Arc::new(ScriptedGenerator::new("secondary", vec![Some("other")]));
        let chain = ProviderChain::new(vec![
            primary.clone() as Arc<dyn Generator>,
            secondary.clone(),
        ]);

        let generated = chain.generate_with_source(&request()).await.unwrap();
        assert_eq!(generated.provider, "primary");
        assert_eq!(generated.text, "fixed");
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_errors_and_blank_replies_fall_through() {
        let failing = Arc::new(ScriptedGenerator::failing("down"));
        let blank = Arc::new(ScriptedGenerator::new("blank", vec![Some("   ")]));
        let local = Arc::new(ScriptedGenerator::new("local", vec![Some("ok")]));
        let chain = ProviderChain::new(vec![
            failing.clone() as Arc<dyn Generator>,
            blank.clone(),
            local.clone(),
        ]);

        assert_eq!(chain.generate(&request()).await.as_deref(), Some("ok"));
        assert_eq!(failing.call_count(), 1);
        assert_eq!(blank.call_count(), 1);
        assert_eq!(local.call_count(), 1);
    }

    #[tokio::test]
    async fn test_each_provider_tried_once_per_call() {
        let a = Arc::new(ScriptedGenerator::failing("a"));
        let b = Arc::new(ScriptedGenerator::failing("b"));
        let chain = ProviderChain::new(vec![a.clone() as Arc<dyn Generator>, b.clone()]);

        assert_eq!(chain.generate(&request()).await, None);
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[test]
    fn test_from_config_without_credentials_is_offline() {
        let chain = ProviderChain::from_config(&Config::default());
        assert!(chain.is_empty());
    }

    #[test]
    fn test_from_config_orders_primary_before_local() {
        let config = Config {
            asi1_api_key: Some("sk-test".to_string()),
            ollama_base_url: Some("http://localhost:11434".to_string()),
            ..Config::default()
        };
        let names = ProviderChain::from_config(&config).provider_names();
        assert!(names.len() >= 2);
        assert!(names.first().unwrap().starts_with("asi1"));
        assert!(names.last().unwrap().starts_with("ollama"));
    }
}
