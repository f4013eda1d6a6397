use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use farewatch_core::{CoreError, CoreResult, QueryExtractor};
use farewatch_shared::Masked;
use farewatch_store::app_config::LlmConfig;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::http::{self, truncate};

/// OpenAI-compatible chat completion client that extracts flight search parameters
pub struct OpenAiExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: Masked<String>,
}

impl OpenAiExtractor {
    pub fn new(config: &LlmConfig) -> CoreResult<Self> {
        let api_key = match &config.api_key {
            Some(key) if !key.is_blank() => key.clone(),
            _ => return Err(CoreError::ConfigError("Missing llm.api_key".into())),
        };
        Ok(Self {
            client: http::client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

pub fn system_prompt(today: NaiveDate) -> String {
    format!(
        "Today is {}.\n\
         You extract flight search parameters.\n\
         \n\
         Return ONLY valid JSON with the keys: from, to, date, passengers, cabin, nonstop, flexibleDays.\n\
         \n\
         Rules:\n\
         - \"date\" must be ISO format YYYY-MM-DD.\n\
         - Use the current year if not specified.\n\
         - Resolve relative dates like \"next Wednesday\" to an actual date.\n\
         - Cabin must be one of: economy, premium_economy, business, first.\n\
         - If required info is missing, return {{\"need_clarification\": true, \"question\": \"...\"}}.\n\
         - If a city is given, prefer a representative airport code (e.g. Tokyo Haneda -> HND).",
        today.format("%Y-%m-%d")
    )
}

fn message_content(body: &Value) -> CoreResult<String> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoreError::UpstreamError("Chat completion response has no message content".into()))
}

#[async_trait]
impl QueryExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str, model: &str) -> CoreResult<String> {
        debug!(model, "Calling chat completion");
        let body = json!({
            "model": model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system_prompt(Utc::now().date_naive()) },
                { "role": "user", "content": format!("User text: {}", text) }
            ]
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport_error("Chat completion request failed", e))?;

        let (status, json) = http::read_json("Chat completion request failed", response).await?;
        if !status.is_success() {
            warn!(%status, model, "Chat completion rejected");
            return Err(CoreError::UpstreamError(format!(
                "Chat completion error ({}): {}",
                status,
                truncate(&json.to_string(), 200)
            )));
        }

        message_content(&json)
    }
}
