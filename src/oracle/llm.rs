use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse::parse_judgment;
use super::prompts;
use super::Scorer;
use crate::config::OracleConfig;
use crate::model::{Candidate, Judgment};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// OpenAI-compatible chat completions client used as the scoring oracle.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion constrained to a JSON object reply.
    pub async fn chat_json(&self, messages: &[Message]) -> Result<String> {
        self.complete(messages, 512, true).await
    }

    /// Non-streaming free-text chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        self.complete(messages, 2048, false).await
    }

    async fn complete(&self, messages: &[Message], max_tokens: u32, json_reply: bool) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": max_tokens,
        });
        if json_reply {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("LLM request failed")?
            .error_for_status()
            .context("LLM returned an error status")?;
        let text = resp.text().await.context("Failed to read LLM response")?;
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        // choices[0].message.content, which may be null
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or("")
            .to_string();

        Ok(content)
    }
}

#[async_trait]
impl Scorer for LlmClient {
    async fn judge(&self, candidate: &Candidate) -> Result<Judgment> {
        let messages = vec![
            Message {
                role: "system".to_string(),
                content: prompts::SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: prompts::scoring_prompt(candidate),
            },
        ];
        let reply = self.chat_json(&messages).await?;
        let judgment = parse_judgment(&reply)?;
        debug!(title = %candidate.title, score = judgment.score, "oracle judged candidate");
        Ok(judgment)
    }
}
