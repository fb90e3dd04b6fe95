//! Configuration management for chaos-reviewer
//!
//! Settings come from ~/.config/chaos-reviewer/config.json (optional),
//! then environment variables, which always win.

use crate::keyring;
use crate::llm::PromptStyle;
use crate::util::parse_bool_flag;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_ASI1_MODEL: &str = "asi1-mini";
pub const DEFAULT_ASI1_BASE_URL: &str = "https://api.asi1.ai/v1";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefer the keychain or ASI1_API_KEY over storing this in the file.
    pub asi1_api_key: Option<String>,
    pub asi1_model: String,
    pub asi1_base_url: String,
    /// Local Ollama server; the secondary provider is off when unset.
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,
    /// Playful (roasting) prompt register; false switches to neutral.
    pub playful: bool,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub bridge: BridgeConfig,
}

/// Where the polling bridge reads requests and writes replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub request_url: Option<String>,
    pub response_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asi1_api_key: None,
            asi1_model: DEFAULT_ASI1_MODEL.to_string(),
            asi1_base_url: DEFAULT_ASI1_BASE_URL.to_string(),
            ollama_base_url: None,
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            playful: true,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            bridge: BridgeConfig::default(),
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        self.asi1_api_key = non_empty(self.asi1_api_key.take());
        self.ollama_base_url = non_empty(self.ollama_base_url.take());
        self.bridge.request_url = non_empty(self.bridge.request_url.take());
        self.bridge.response_url = non_empty(self.bridge.response_url.take());
        self.bridge.api_key = non_empty(self.bridge.api_key.take());

        let base = self.asi1_base_url.trim().trim_end_matches('/');
        self.asi1_base_url = if base.is_empty() {
            DEFAULT_ASI1_BASE_URL.to_string()
        } else {
            base.to_string()
        };
        if self.asi1_model.trim().is_empty() {
            self.asi1_model = DEFAULT_ASI1_MODEL.to_string();
        }
        if self.ollama_model.trim().is_empty() {
            self.ollama_model = DEFAULT_OLLAMA_MODEL.to_string();
        }
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chaos-reviewer"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env(|name| std::env::var(name).ok());
        config.sanitize();
        config
    }

    /// Load a config file, or defaults when it is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str::<Config>(&content) {
                Ok(mut config) => {
                    config.sanitize();
                    return config;
                }
                Err(err) => {
                    preserve_corrupt_config(path, &content);
                    warn!(
                        "config file {} was corrupted ({}); a backup was saved and defaults were loaded",
                        path.display(),
                        err
                    );
                }
            }
        }
        Self::default()
    }

    /// Apply overrides from an environment-like lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get("ASI1_API_KEY") {
            self.asi1_api_key = Some(key);
        }
        if let Some(model) = get("ASI1_MODEL") {
            self.asi1_model = model;
        }
        if let Some(base) = get("ASI1_BASE_URL") {
            self.asi1_base_url = base;
        }
        if let Some(base) = get("OLLAMA_BASE_URL") {
            self.ollama_base_url = Some(base);
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.ollama_model = model;
        }
        if let Some(flag) = get("CHAOS_PLAYFUL").and_then(|v| parse_bool_flag(&v)) {
            self.playful = flag;
        }
        if let Some(secs) = get("CHAOS_POLL_SECS").and_then(|v| v.parse().ok()) {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = get("CHAOS_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(url) = get("CHAOS_BRIDGE_REQUEST_URL") {
            self.bridge.request_url = Some(url);
        }
        if let Some(url) = get("CHAOS_BRIDGE_RESPONSE_URL") {
            self.bridge.response_url = Some(url);
        }
        if let Some(key) = get("CHAOS_BRIDGE_API_KEY") {
            self.bridge.api_key = Some(key);
        }
    }

    /// The ASI:One key: config/env first, then the system keychain.
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = &self.asi1_api_key {
            return Some(key.clone());
        }
        match keyring::get_api_key() {
            Ok(key) => key,
            Err(err) => {
                keyring::warn_keychain_error_once("API key", &err);
                None
            }
        }
    }

    /// The bridge document key: config/env first, then the system keychain.
    pub fn bridge_api_key(&self) -> Option<String> {
        if let Some(key) = &self.bridge.api_key {
            return Some(key.clone());
        }
        match keyring::get_bridge_key() {
            Ok(key) => key,
            Err(err) => {
                keyring::warn_keychain_error_once("bridge key", &err);
                None
            }
        }
    }

    pub fn prompt_style(&self) -> PromptStyle {
        if self.playful {
            PromptStyle::Playful
        } else {
            PromptStyle::Neutral
        }
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/chaos-reviewer/config.json".to_string())
    }
}

/// Interactive prompt to store the ASI:One key in the keychain
pub fn setup_api_key_interactive() -> Result<(), String> {
    use std::io::{self, Write};

    println!();
    println!("  ASI:One setup");
    println!("  ─────────────");
    println!();
    println!("  chaos-reviewer asks ASI:One for one-line fixes and explanations.");
    println!("  Without a key it still answers, using its built-in fix table.");
    println!();
    print!("  API Key: ");
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut key = String::new();
    io::stdin().read_line(&mut key).map_err(|e| e.to_string())?;
    let key = key.trim();

    if key.is_empty() {
        return Err("No API key provided".to_string());
    }

    keyring::set_api_key(key).map_err(|e| {
        format!(
            "Failed to store API key in {}: {}. You can set the ASI1_API_KEY environment variable instead.",
            keyring::credentials_store_label(),
            e
        )
    })?;

    println!();
    println!("  + API key saved to {}", keyring::credentials_store_label());
    println!();
    print!("  Bridge key (optional, Enter to skip): ");
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut bridge_key = String::new();
    io::stdin().read_line(&mut bridge_key).map_err(|e| e.to_string())?;
    if let Some(bridge_key) = non_empty(Some(bridge_key)) {
        keyring::set_bridge_key(&bridge_key).map_err(|e| {
            format!(
                "Failed to store bridge key in {}: {}. You can set CHAOS_BRIDGE_API_KEY instead.",
                keyring::credentials_store_label(),
                e
            )
        })?;
        println!("  + Bridge key saved to {}", keyring::credentials_store_label());
        println!();
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let corrupt_path = path.with_extension(format!("json.corrupt-{}", stamp));
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}
