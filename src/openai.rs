use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::backend::{Backend, Completion, CompletionRequest};
use crate::config::OpenAiConfig;
use crate::error::BackendError;

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

/// OpenAI Responses API client; one HTTP request per `invoke`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: responses_endpoint(&config.base_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, BackendError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": request.prompt,
            "temperature": request.temperature,
            "top_p": request.nucleus_p,
            "max_output_tokens": request.max_tokens,
            "text": { "format": { "type": "text" } },
            "store": false,
        });

        tracing::debug!(
            slot = %request.slot,
            model = %self.model,
            temperature = request.temperature,
            top_p = request.nucleus_p,
            max_tokens = request.max_tokens,
            "openai request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport_error(&self.endpoint, &err))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| classify_transport_error(&self.endpoint, &err))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            return Err(classify_status(status, &message));
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|err| BackendError::invalid_response(format!("parse OpenAI response: {err}")))?;
        let text = extract_output_text(&value)?;
        let tokens_used = extract_total_tokens(&value);
        Ok(Completion { text, tokens_used })
    }
}

fn classify_transport_error(endpoint: &str, err: &reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::timeout(format!("POST {endpoint}: {err}"))
    } else {
        BackendError::unknown(format!("POST {endpoint}: {err}"))
    }
}

fn classify_status(status: StatusCode, message: &str) -> BackendError {
    let message = format!("OpenAI API error ({status}): {message}");
    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::rate_limited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::auth_failure(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            BackendError::timeout(message)
        }
        _ => BackendError::unknown(message),
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> Result<String, BackendError> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| BackendError::invalid_response("missing `output` array in response"))?;

    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            let Some(part_text) = part.get("text").and_then(|v| v.as_str()) else {
                continue;
            };
            text.push_str(part_text);
        }
    }

    if text.trim().is_empty() {
        return Err(BackendError::invalid_response("OpenAI output text is empty"));
    }
    Ok(text)
}

fn extract_total_tokens(value: &serde_json::Value) -> u64 {
    let Some(usage) = value.get("usage") else {
        return 0;
    };
    if let Some(total) = usage.get("total_tokens").and_then(|v| v.as_u64()) {
        return total;
    }
    let input = usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
    let output = usage.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
    input + output
}
