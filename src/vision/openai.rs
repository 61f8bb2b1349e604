use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{prompt, AnalysisSource, VisionError};
use crate::analysis::{AnalysisMode, RawAnalysis};
use crate::config::VisionConfig;
use crate::media::ImagePayload;
use crate::profiles::Tier;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    max_tokens: u32,
    temperature: f32,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions client for an OpenAI-compatible vision model.
#[derive(Debug, Clone)]
pub struct OpenAiVision {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiVision {
    pub fn new(api_key: String, cfg: &VisionConfig) -> Result<Self, VisionError> {
        Self::with_base_url(
            api_key,
            cfg.model.clone(),
            cfg.base_url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, VisionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnalysisSource for OpenAiVision {
    async fn analyze(
        &self,
        image: &ImagePayload,
        mode: AnalysisMode,
        tier: Tier,
    ) -> Result<RawAnalysis, VisionError> {
        let plan = prompt::build(mode, tier);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                json!({ "role": "system", "content": plan.system }),
                json!({
                    "role": "user",
                    "content": [
                        { "type": "text", "text": plan.user },
                        {
                            "type": "image_url",
                            "image_url": { "url": image.data_url(), "detail": plan.detail }
                        }
                    ]
                }),
            ],
            max_tokens: plan.max_tokens,
            temperature: 0.2,
            response_format: json!({ "type": "json_object" }),
        };

        tracing::debug!(model = %self.model, %mode, %tier, detail = plan.detail, "calling vision model");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VisionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), body = %body, "vision API error");
            return Err(VisionError::Unavailable(format!("status {}", status.as_u16())));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Malformed(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| VisionError::Malformed("empty completion".into()))?;

        parse_analysis(&content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub(crate) fn parse_analysis(content: &str) -> Result<RawAnalysis, VisionError> {
    let json = strip_fences(content);
    let value: Value =
        serde_json::from_str(json).map_err(|e| VisionError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(VisionError::Malformed("expected a JSON object".into()));
    }
    serde_json::from_value(value).map_err(|e| VisionError::Malformed(e.to_string()))
}

fn strip_fences(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
