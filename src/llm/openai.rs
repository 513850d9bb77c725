//! OpenAI 호환 Chat Completions
//!
//! HuggingFace router, OpenAI, Ollama 등 `/chat/completions`를 제공하는 서버에 사용합니다.
//! ref: https://huggingface.co/docs/inference-providers/tasks/chat-completion

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{ChatMessage, ChatModel, Reply};
use crate::config::LlmConfig;

/// OpenAI 호환 채팅 모델
pub struct OpenAiCompatChat {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    index: u32,
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

/// 응답 본문 → Reply 목록
fn parse_chat_response(body: &str) -> Result<Vec<Reply>> {
    let response: ChatResponse =
        serde_json::from_str(body).context("Failed to parse chat completion response")?;

    Ok(response
        .choices
        .into_iter()
        .filter_map(|choice| {
            let content = choice.message.content?;
            let mut meta = Map::new();
            if let Some(model) = &response.model {
                meta.insert("model".to_string(), json!(model));
            }
            meta.insert("index".to_string(), json!(choice.index));
            if let Some(reason) = choice.finish_reason {
                meta.insert("finish_reason".to_string(), json!(reason));
            }
            if let Some(usage) = &response.usage {
                meta.insert("usage".to_string(), usage.clone());
            }
            Some(Reply { content, meta })
        })
        .collect())
}

#[async_trait]
impl ChatModel for OpenAiCompatChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Vec<Reply>> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            n: 1,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send chat completion request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("Chat completion error ({}): {}", status, body);
        }

        parse_chat_response(&body)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmBackend;

    fn config() -> LlmConfig {
        LlmConfig {
            backend: LlmBackend::OpenAi,
            model: "llama3".to_string(),
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: None,
            max_tokens: 256,
        }
    }

    #[test]
    fn test_url() {
        let chat = OpenAiCompatChat::new(&config()).unwrap();
        assert_eq!(chat.url, "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "llama3",
            messages: &messages,
            max_tokens: 256,
            n: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "meta-llama/Llama-3.1-8B-Instruct",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Einstein was a physicist." }, "finish_reason": "stop" },
                { "index": 1, "message": { "role": "assistant", "content": null }, "finish_reason": "length" }
            ],
            "usage": { "prompt_tokens": 120, "completion_tokens": 8 }
        }"#;
        let replies = parse_chat_response(body).unwrap();

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "Einstein was a physicist.");
        assert_eq!(replies[0].meta["finish_reason"], "stop");
        assert_eq!(replies[0].meta["usage"]["prompt_tokens"], 120);
    }

    #[test]
    fn test_parse_empty_choices() {
        assert!(parse_chat_response(r#"{ "choices": [] }"#).unwrap().is_empty());
        assert!(parse_chat_response("not json").is_err());
    }
}
