//! LLM 모듈 - 답변 생성
//!
//! 시스템/사용자 메시지를 언어 모델에 보내고 응답을 답변 객체로 만듭니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let llm = create_chat_model(&config.llm)?;
//! let replies = llm.chat(&messages).await?;
//! let answers = AnswerBuilder::build(query, replies, documents);
//! ```

mod gemini;
mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{LlmBackend, LlmConfig};
use crate::error::RagError;
use crate::knowledge::Document;

pub use gemini::GeminiChat;
pub use openai::OpenAiCompatChat;

// ============================================================================
// Types
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 채팅 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 모델 응답 하나
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    /// 모델명, 종료 사유, 토큰 사용량 등
    pub meta: Map<String, Value>,
}

/// 최종 답변
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAnswer {
    /// 답변 텍스트
    pub data: String,
    /// 원래 질문
    pub query: String,
    /// 근거 문서
    pub documents: Vec<Document>,
    /// 응답 메타데이터
    pub meta: Map<String, Value>,
}

// ============================================================================
// ChatModel Trait
// ============================================================================

/// 채팅 모델 트레이트
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 메시지 목록 → 응답 목록 (보통 1개)
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Vec<Reply>>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// AnswerBuilder
// ============================================================================

/// 응답 + 근거 문서 → 답변
pub struct AnswerBuilder;

impl AnswerBuilder {
    /// 응답마다 답변 하나 (모든 답변이 같은 근거 문서를 가짐)
    pub fn build(query: &str, replies: Vec<Reply>, documents: &[Document]) -> Vec<GeneratedAnswer> {
        replies
            .into_iter()
            .map(|reply| GeneratedAnswer {
                data: reply.content.trim().to_string(),
                query: query.to_string(),
                documents: documents.to_vec(),
                meta: reply.meta,
            })
            .collect()
    }

    /// 첫 번째 답변 (응답이 없으면 에러)
    pub fn first(
        query: &str,
        replies: Vec<Reply>,
        documents: &[Document],
    ) -> Result<GeneratedAnswer, RagError> {
        Self::build(query, replies, documents)
            .into_iter()
            .next()
            .ok_or(RagError::EmptyReply)
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 채팅 모델 생성
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    let model: Arc<dyn ChatModel> = match config.backend {
        LlmBackend::HuggingFace | LlmBackend::OpenAi => {
            if config.backend == LlmBackend::HuggingFace && config.api_key.is_none() {
                return Err(RagError::MissingCredential("HF_TOKEN").into());
            }
            Arc::new(OpenAiCompatChat::new(config)?)
        }
        LlmBackend::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or(RagError::MissingCredential("GEMINI_API_KEY"))?;
            Arc::new(GeminiChat::new(api_key, config)?)
        }
    };

    tracing::info!("Using language model: {}", model.name());
    Ok(model)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(content: &str) -> Reply {
        let mut meta = Map::new();
        meta.insert("model".to_string(), json!("test-model"));
        Reply {
            content: content.to_string(),
            meta,
        }
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json, json!({ "role": "system", "content": "be brief" }));
    }

    #[test]
    fn test_answer_builder() {
        let docs = vec![Document::new("Albert Einstein instance of human", Map::new())];
        let answers = AnswerBuilder::build(
            "Who is Albert Einstein?",
            vec![reply("  A physicist.  "), reply("Second")],
            &docs,
        );

        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].data, "A physicist.");
        assert_eq!(answers[0].query, "Who is Albert Einstein?");
        assert_eq!(answers[0].documents, docs);
        assert_eq!(answers[0].meta["model"], "test-model");
    }

    #[test]
    fn test_first_without_replies() {
        let result = AnswerBuilder::first("q", vec![], &[]);
        assert!(matches!(result, Err(RagError::EmptyReply)));
    }

    #[test]
    fn test_create_chat_model_requires_key() {
        let mut config = crate::config::Config::from_lookup(|_| None).llm;
        assert!(create_chat_model(&config).is_err());

        config.backend = LlmBackend::Gemini;
        assert!(create_chat_model(&config).is_err());

        config.api_key = Some("key".to_string());
        let model = create_chat_model(&config).unwrap();
        assert_eq!(model.name(), config.model);
    }

    #[test]
    fn test_openai_backend_allows_keyless_local_server() {
        let mut config = crate::config::Config::from_lookup(|_| None).llm;
        config.backend = LlmBackend::OpenAi;
        config.base_url = "http://localhost:11434/v1".to_string();
        assert!(create_chat_model(&config).is_ok());
    }
}
