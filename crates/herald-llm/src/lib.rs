//! Completion gateway adapter (OpenAI-compatible chat completions).
//!
//! Works against LiteLLM-style proxies and anything else speaking the same
//! `/chat/completions` shape, including local inference servers.

use async_trait::async_trait;
use serde::Serialize;

use herald_core::completion::{CompletionClient, CompletionResult};
use herald_core::{errors::Error, Result};

/// Response cost header set by LiteLLM-style gateways. Backends that do not
/// meter billing simply omit it.
const COST_HEADER: &str = "x-litellm-response-cost";

#[derive(Clone, Debug, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    /// The fixed permissive set forwarded with every request. Gateways that
    /// do not understand Gemini safety settings ignore the field.
    pub fn permissive_defaults() -> Vec<SafetySetting> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_NONE".to_string(),
        })
        .collect()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    safety_settings: &'a [SafetySetting],
}

#[derive(Clone, Debug)]
pub struct HttpCompletionClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    safety_settings: Vec<SafetySetting>,
    http: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client build");
        Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            safety_settings: SafetySetting::permissive_defaults(),
            http,
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<CompletionResult> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            safety_settings: &self.safety_settings,
        };

        let mut call = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&req);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let resp = call
            .send()
            .await
            .map_err(|e| Error::Completion(format!("completion request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let cost = parse_cost_header(resp.headers());

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Completion(format!("completion json error: {e}")))?;

        parse_completion(&v, cost)
    }
}

fn parse_cost_header(headers: &reqwest::header::HeaderMap) -> Option<f64> {
    headers
        .get(COST_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

/// Extract the reply body and token usage from a chat-completions response.
fn parse_completion(v: &serde_json::Value, cost: Option<f64>) -> Result<CompletionResult> {
    let body = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();

    if body.trim().is_empty() {
        return Err(Error::Completion(
            "completion returned empty content".to_string(),
        ));
    }

    let usage = v.get("usage");
    let prompt_tokens = usage
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(|t| t.as_u64())
        .unwrap_or(0);
    let completion_tokens = usage
        .and_then(|u| u.get("completion_tokens"))
        .and_then(|t| t.as_u64())
        .unwrap_or(0);

    Ok(CompletionResult {
        body,
        prompt_tokens,
        completion_tokens,
        cost,
    })
}
