//! HTTP completion clients.

use super::client::{ClientError, CompletionClient};
use super::config::AnalyticsConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

fn http_client(timeout_seconds: f64) -> Result<reqwest::Client, ClientError> {
    let timeout = Duration::try_from_secs_f64(timeout_seconds)
        .ok()
        .filter(|t| !t.is_zero())
        .ok_or_else(|| {
            ClientError::InvalidConfig(format!("request timeout must be positive, got {timeout_seconds}"))
        })?;

    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Transport(e.to_string()))
}

async fn post_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ClientError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Creates a client with an explicit key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, config: &AnalyticsConfig) -> Result<Self, ClientError> {
        Ok(Self {
            api_key: api_key.into(),
            client: http_client(config.request_timeout_seconds)?,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
        })
    }

    /// Creates a client keyed from `GOOGLE_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingApiKey` if the variable is unset.
    pub fn from_env(config: &AnalyticsConfig) -> Result<Self, ClientError> {
        let key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| ClientError::MissingApiKey("GOOGLE_API_KEY"))?;
        Self::new(key, config)
    }

    fn parse_response(body: &serde_json::Value) -> Result<String, ClientError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| ClientError::InvalidResponse("missing candidates".to_string()))?;

        Ok(candidates
            .iter()
            .filter_map(|c| c["content"]["parts"].as_array())
            .flatten()
            .filter_map(|part| part["text"].as_str())
            .collect())
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let request = self.client.post(url).header("x-goog-api-key", &self.api_key);
        let response = post_json(request, &body).await?;
        Self::parse_response(&response)
    }
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Creates a client with an explicit key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, config: &AnalyticsConfig) -> Result<Self, ClientError> {
        Ok(Self {
            api_key: api_key.into(),
            client: http_client(config.request_timeout_seconds)?,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        })
    }

    /// Creates a client keyed from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingApiKey` if the variable is unset.
    pub fn from_env(config: &AnalyticsConfig) -> Result<Self, ClientError> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ClientError::MissingApiKey("OPENAI_API_KEY"))?;
        Self::new(key, config)
    }

    fn parse_response(body: &serde_json::Value) -> Result<String, ClientError> {
        match &body["choices"][0]["message"]["content"] {
            serde_json::Value::String(text) => Ok(text.clone()),
            serde_json::Value::Null if body["choices"].is_array() => Ok(String::new()),
            _ => Err(ClientError::InvalidResponse(
                "missing choices[0].message.content".to_string(),
            )),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn describe(&self) -> String {
        format!("openai/{}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let request = self.client.post(url).bearer_auth(&self.api_key);
        let response = post_json(request, &body).await?;
        Self::parse_response(&response)
    }
}
