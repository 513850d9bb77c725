//! Gemini generateContent
//!
//! source: https://ai.google.dev/api/generate-content

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use super::{ChatMessage, ChatModel, Reply, Role};
use crate::config::LlmConfig;

/// Gemini 채팅 모델
pub struct GeminiChat {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    max_tokens: u32,
}

impl GeminiChat {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let model = config.model.trim_start_matches("models/").to_string();
        Ok(Self {
            client,
            api_key,
            url: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                model
            ),
            model,
            max_tokens: config.max_tokens,
        })
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "modelVersion", default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

/// 메시지 → 요청 본문 (시스템 메시지는 systemInstruction으로 합침)
fn build_request(messages: &[ChatMessage], max_tokens: u32) -> GenerateRequest {
    let system: Vec<Part> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| Part {
            text: m.content.clone(),
        })
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: Some(
                match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    GenerateRequest {
        system_instruction: (!system.is_empty()).then_some(Content {
            role: None,
            parts: system,
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: 0.1,
            max_output_tokens: max_tokens,
        },
    }
}

fn parse_generate_response(body: &str) -> Result<Vec<Reply>> {
    let response: GenerateResponse =
        serde_json::from_str(body).context("Failed to parse generateContent response")?;

    Ok(response
        .candidates
        .into_iter()
        .filter_map(|candidate| {
            let text: String = candidate
                .content?
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect();
            if text.is_empty() {
                return None;
            }
            let mut meta = Map::new();
            if let Some(model) = &response.model_version {
                meta.insert("model".to_string(), json!(model));
            }
            if let Some(reason) = candidate.finish_reason {
                meta.insert("finish_reason".to_string(), json!(reason));
            }
            Some(Reply { content: text, meta })
        })
        .collect())
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Vec<Reply>> {
        let request = build_request(messages, self.max_tokens);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generateContent request")?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let replies = parse_generate_response(&body)?;
        if replies.is_empty() {
            tracing::warn!("Gemini returned no text candidates");
        }
        Ok(replies)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
