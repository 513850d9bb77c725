//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 폴백 검색 시 쿼리와 Wikidata 문장을 벡터로 변환합니다.
//! 프로바이더는 `EMBEDDING_PROVIDER` 환경변수로 선택합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&config.embedding)?;
//! let embedding = embedder.embed("Who is Albert Einstein?").await?;
//! ```

mod gemini;
mod huggingface;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{EmbeddingBackend, EmbeddingConfig};

pub use gemini::{GeminiEmbedding, DEFAULT_DIMENSION};
pub use huggingface::HuggingFaceEmbedding;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수 (모르면 0)
    fn dimension(&self) -> usize;

    /// 프로바이더/모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let api_key = config.require_api_key()?.to_string();

    let embedder: Arc<dyn EmbeddingProvider> = match config.backend {
        EmbeddingBackend::HuggingFace => {
            Arc::new(HuggingFaceEmbedding::new(api_key, config.model.clone())?)
        }
        EmbeddingBackend::Gemini => Arc::new(GeminiEmbedding::with_model(
            api_key,
            config.model.clone(),
            DEFAULT_DIMENSION,
        )?),
    };

    tracing::info!("Using embedding model: {}", embedder.name());
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================
