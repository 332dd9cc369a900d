use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::blocking::Client;
use reqwest::header;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::textutil::log_preview;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Debug)]
pub struct AnthropicSettings {
    pub endpoint: String,
    pub model: String,
    pub api_version: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Blocking client for the Messages API. One attempt per call; the caller owns
/// any fallback.
pub struct AnthropicClient {
    http: Client,
    settings: AnthropicSettings,
}

impl AnthropicClient {
    pub fn new(settings: AnthropicSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { http, settings })
    }

    fn url(&self) -> String {
        format!("{}/v1/messages", self.settings.endpoint.trim_end_matches('/'))
    }
}

impl TextGenerator for AnthropicClient {
    fn generate(&mut self, prompt: &str, max_tokens: u32) -> anyhow::Result<String> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };
        log::debug!(
            "POST {} model={} max_tokens={max_tokens} prompt={}",
            self.url(),
            self.settings.model,
            log_preview(prompt, 120)
        );

        let resp = self
            .http
            .post(self.url())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", &self.settings.api_version)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .context("send messages request")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(e) => format!("{}: {}", e.error.kind, e.error.message),
                Err(_) => log_preview(&text, 200),
            };
            return Err(anyhow!("messages API returned {status}: {detail}"));
        }

        let parsed: MessagesResponse = resp.json().context("decode messages response")?;
        let text = join_text_blocks(&parsed.content);
        if text.trim().is_empty() {
            return Err(anyhow!("messages API returned no text content"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}

fn join_text_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.kind.is_empty() || b.kind == "text")
        .filter_map(|b| b.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}
