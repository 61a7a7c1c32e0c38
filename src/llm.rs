//! Chat-completion backed oracles.
//!
//! [`ChatOracle`] implements all three oracle traits against an
//! OpenAI-compatible `POST {url}/chat/completions` endpoint in JSON mode.
//! It makes exactly one request per call and returns every failure as an
//! error: HTTP status, transport error, or an answer that is not a JSON
//! object. Retrying is the caller's business (see [`crate::decide`]).
//!
//! Use [`create_oracle`] to build one from `[oracle]` configuration.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use timeline_curator_core::models::CandidateEvent;
use timeline_curator_core::oracle::{
    ClassificationOracle, ClassificationResponse, DuplicateOracle, DuplicateVerdict,
    MergeOracle, MergeRequest, MergeResponse,
};
use timeline_curator_core::taxonomy::Taxonomy;

use crate::config::OracleConfig;
use crate::prompts;

/// An OpenAI-compatible chat model used as classification, merge, and
/// duplicate oracle.
pub struct ChatOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatOracle {
    /// Send one system/user exchange and decode the JSON answer as `T`.
    async fn ask<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("oracle request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("oracle API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let content = extract_content(&json)?;
        parse_answer(content)
    }
}

/// Pull `choices[0].message.content` out of a chat-completion response.
fn extract_content(json: &serde_json::Value) -> Result<&str> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

/// Decode the model's answer, tolerating a surrounding markdown code fence.
fn parse_answer<T: DeserializeOwned>(content: &str) -> Result<T> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).context("oracle answer is not the expected JSON object")
}

#[async_trait]
impl ClassificationOracle for ChatOracle {
    async fn classify(
        &self,
        candidate: &CandidateEvent,
        taxonomy: &Taxonomy,
    ) -> Result<ClassificationResponse> {
        let (system, user) = prompts::classify_messages(candidate, taxonomy)?;
        self.ask(&system, &user).await
    }
}

#[async_trait]
impl MergeOracle for ChatOracle {
    async fn decide(&self, request: &MergeRequest<'_>) -> Result<MergeResponse> {
        let (system, user) = prompts::merge_messages(request)?;
        self.ask(&system, &user).await
    }
}

#[async_trait]
impl DuplicateOracle for ChatOracle {
    async fn compare(
        &self,
        description_a: &str,
        description_b: &str,
        date_a: &str,
        date_b: &str,
    ) -> Result<DuplicateVerdict> {
        let (system, user) =
            prompts::duplicate_messages(description_a, description_b, date_a, date_b)?;
        self.ask(&system, &user).await
    }
}

/// Build the oracle named by `config.provider`.
///
/// | Config Value | Result |
/// |-------------|--------|
/// | `"disabled"` | error: curation needs an oracle |
/// | `"openai"` | [`ChatOracle`] |
///
/// # Errors
///
/// Fails for a disabled or unknown provider, a missing model, or when the
/// API key environment variable is unset.
pub fn create_oracle(config: &OracleConfig) -> Result<Arc<ChatOracle>> {
    match config.provider.as_str() {
        "openai" => {
            let model = config
                .model
                .clone()
                .ok_or_else(|| anyhow!("oracle.model required"))?;
            let api_key = std::env::var(&config.api_key_env)
                .map_err(|_| anyhow!("{} not set", config.api_key_env))?;
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;
            Ok(Arc::new(ChatOracle {
                client,
                endpoint: format!("{}/chat/completions", config.url.trim_end_matches('/')),
                model,
                api_key,
                temperature: config.temperature,
            }))
        }
        "disabled" => bail!(
            "Oracle provider is disabled. Set [oracle] provider = \"openai\" and a model to curate."
        ),
        other => bail!("Unknown oracle provider: {}", other),
    }
}
