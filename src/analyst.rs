use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::poller::PollError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "Based on the news article, provide a trading decision (buy, sell, or hold) and a brief explanation";

/// Turns article text into a short trading decision.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn decide(&self, article: &str) -> Result<String, PollError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
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
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API client.
pub struct ClaudeAnalyst {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeAnalyst {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }
}

#[async_trait]
impl Analyst for ClaudeAnalyst {
    async fn decide(&self, article: &str) -> Result<String, PollError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!("Requesting trading decision from {}", self.model);

        let request = MessagesRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: article,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status { url, status });
        }

        let body: MessagesResponse = response.json().await?;
        body.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| PollError::Analysis("response contained no text".to_string()))
    }
}
