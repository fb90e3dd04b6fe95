//! Text generation: provider adapters, the fallback chain, and the two
//! composers (fix line and explanation) built on top of it.

pub mod client;
pub mod explain;
pub mod fix;
pub mod prompts;
pub mod providers;
pub mod static_rules;

pub use client::{Generated, GenerateFuture, GenerationRequest, Generator, ProviderChain};
pub use explain::compose_explanation;
pub use fix::compose_fix;
pub use prompts::PromptStyle;
pub use providers::{AsiProvider, AuthHeader, OllamaProvider};
pub use static_rules::{classify_message, fallback_fix, FixRule};
