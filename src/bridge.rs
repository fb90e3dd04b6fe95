//! Polling bridge over a shared remote JSON document.
//!
//! A producer writes `{ts, log_tail|text, context}` to the request document;
//! the bridge polls it, answers each new `ts` once, and writes `{ts, lines}`
//! to the response document.

use crate::config::Config;
use crate::error::BridgeError;
use crate::reply::{InboundRequest, OutboundReply, Reviewer};
use crate::util::truncate_str;
use chrono::Utc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const MASTER_KEY_HEADER: &str = "X-Master-Key";
const MAX_ERROR_BODY_LEN: usize = 200;

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Decode a request document. JSONBin-style `{"record": {...}}` wrappers are
/// unwrapped first.
pub fn parse_document(body: &str) -> BridgeResult<InboundRequest> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let value = match value {
        serde_json::Value::Object(mut map)
            if map.get("record").is_some_and(serde_json::Value::is_object) =>
        {
            map.remove("record").unwrap_or_default()
        }
        other => other,
    };
    Ok(serde_json::from_value(value)?)
}

pub struct Bridge {
    client: reqwest::Client,
    request_url: String,
    response_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    /// Newest request `ts` already taken.
    watermark: Option<i64>,
}

impl Bridge {
    pub fn from_config(config: &Config) -> BridgeResult<Self> {
        let request_url = config
            .bridge
            .request_url
            .clone()
            .ok_or(BridgeError::NotConfigured("CHAOS_BRIDGE_REQUEST_URL"))?;
        let response_url = config
            .bridge
            .response_url
            .clone()
            .ok_or(BridgeError::NotConfigured("CHAOS_BRIDGE_RESPONSE_URL"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            request_url,
            response_url,
            api_key: config.bridge_api_key(),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            watermark: None,
        })
    }

    pub fn watermark(&self) -> Option<i64> {
        self.watermark
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Take `request` if its `ts` is newer than anything seen, advancing the
    /// watermark. Requests without a positive `ts` are never taken.
    pub fn accept(&mut self, request: &InboundRequest) -> Option<i64> {
        let ts = request.ts.filter(|ts| *ts > 0)?;
        if ts <= self.watermark.unwrap_or(0) {
            return None;
        }
        self.watermark = Some(ts);
        Some(ts)
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(MASTER_KEY_HEADER, key),
            None => builder,
        }
    }

    pub async fn fetch_request(&self) -> BridgeResult<InboundRequest> {
        let response = self.with_key(self.client.get(&self.request_url)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BridgeError::Status {
                status: status.as_u16(),
                body: truncate_str(&body, MAX_ERROR_BODY_LEN).to_string(),
            });
        }
        parse_document(&body)
    }

    pub async fn post_reply(&self, reply: &OutboundReply) -> BridgeResult<()> {
        let response = self
            .with_key(self.client.put(&self.response_url))
            .json(reply)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status {
                status: status.as_u16(),
                body: truncate_str(&body, MAX_ERROR_BODY_LEN).to_string(),
            });
        }
        Ok(())
    }

    /// One poll cycle. Returns whether a reply was written.
    pub async fn poll_once(&mut self, reviewer: &Reviewer) -> BridgeResult<bool> {
        let request = self.fetch_request().await?;
        let Some(ts) = self.accept(&request) else {
            debug!(ts = ?request.ts, watermark = ?self.watermark, "nothing new");
            return Ok(false);
        };

        info!(ts, "bridge request");
        let reply = reviewer.respond_request(&request).await;
        let outbound = OutboundReply {
            ts: Utc::now().timestamp(),
            lines: reply.into_lines(),
        };
        self.post_reply(&outbound).await?;
        info!(ts, "responded via bridge");
        Ok(true)
    }

    /// Poll until ctrl-c. Failures are logged and retried on the next tick.
    pub async fn run(&mut self, reviewer: &Reviewer) -> anyhow::Result<()> {
        info!(
            request_url = %self.request_url,
            every_secs = self.poll_interval.as_secs(),
            "bridge polling"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.poll_once(reviewer).await {
                        warn!("bridge poll failed: {}", err);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("bridge stopping");
                    return Ok(());
                }
            }
        }
    }
}
