use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::analytics::TradeStats;
use crate::config::Config;
use crate::models::{Outcome, Trade};

pub const FALLBACK_PREFIX: &str = "AI report unavailable";

const SYSTEM_PROMPT: &str = "You are a trading coach reviewing a trader's journal. \
Point out recurring mistakes, what is working, and give three concrete suggestions. \
Be direct and brief.";

/// One closed trade as sent to the report model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTrade {
    pub pair: String,
    pub outcome: Outcome,
    pub r_multiple: f64,
    pub reason: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Most recent first.
    pub recent_trades: Vec<ReportTrade>,
    pub stats: TradeStats,
}

/// Anything that can turn a report request into coaching text.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, request: &ReportRequest) -> Result<String>;
}

/// The `limit` most recently entered closed trades plus the stats snapshot.
pub fn build_report_request(trades: &[Trade], stats: &TradeStats, limit: usize) -> ReportRequest {
    let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.outcome.is_closed()).collect();
    closed.sort_by(|a, b| b.date.cmp(&a.date));
    let recent_trades = closed
        .into_iter()
        .take(limit)
        .map(|t| ReportTrade {
            pair: t.pair.clone(),
            outcome: t.outcome,
            r_multiple: t.r_multiple,
            reason: t.reason.clone(),
            notes: t.notes.clone(),
        })
        .collect();
    ReportRequest {
        recent_trades,
        stats: stats.clone(),
    }
}

pub fn fallback_text(reason: &str) -> String {
    format!("{}: {}", FALLBACK_PREFIX, reason)
}

/// Ask the generator for a report. Failures never propagate; the caller
/// always gets text to show.
pub async fn generate_report(generator: Option<&dyn ReportGenerator>, request: &ReportRequest) -> String {
    let Some(generator) = generator else {
        return fallback_text("no report endpoint configured");
    };
    match generator.generate(request).await {
        Ok(text) => text,
        Err(e) => {
            warn!("AI report failed: {:#}", e);
            fallback_text(&format!("{:#}", e))
        }
    }
}

/// OpenAI-compatible chat completion client.
pub struct HttpReportGenerator {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl HttpReportGenerator {
    pub fn new(url: &str, api_key: Option<String>, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building report HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    /// `None` when no endpoint is configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        match &cfg.ai_report_url {
            Some(url) => Ok(Some(Self::new(
                url,
                cfg.ai_report_api_key.clone(),
                &cfg.ai_report_model,
                cfg.ai_report_timeout,
            )?)),
            None => Ok(None),
        }
    }

    fn body(&self, request: &ReportRequest) -> Result<serde_json::Value> {
        let payload = serde_json::to_string(request)?;
        Ok(json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": payload },
            ],
        }))
    }

    fn request(&self, request: &ReportRequest) -> Result<RequestBuilder> {
        let mut req = self.client.post(&self.url).json(&self.body(request)?);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        Ok(req)
    }
}

fn first_choice(parsed: ChatResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| anyhow!("report response had no choices"))
}

#[async_trait]
impl ReportGenerator for HttpReportGenerator {
    async fn generate(&self, request: &ReportRequest) -> Result<String> {
        let req = self.request(request)?;
        info!(
            "Requesting AI report ({} trades) from {}",
            request.recent_trades.len(),
            self.url
        );
        let resp = req.send().await.context("report request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("report endpoint returned {}: {}", status, text));
        }

        let parsed: ChatResponse = resp.json().await.context("invalid report response")?;
        first_choice(parsed)
    }
}
