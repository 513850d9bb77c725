//! RAG 파이프라인 - 검색 → 프롬프트 → 답변
//!
//! 검색 단계는 두 갈래입니다.
//! 1. 벡터 스토어(Astra DB)가 설정되어 있으면 먼저 유사도 검색
//! 2. 결과가 없거나 실패하면 Wikidata에서 문장을 즉석으로 가져와
//!    임베딩 후 인메모리 최근접 이웃 검색 (폴백)

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::knowledge::{AstraVectorStore, Document, InMemoryDocumentStore, SimilarityFunction, VectorStore};
use crate::llm::{create_chat_model, AnswerBuilder, ChatMessage, ChatModel, GeneratedAnswer};
use crate::prompt::{render_user_prompt, system_prompt, Language};
use crate::textification::{FetchOptions, StatementFetcher, StatementSource};

// ============================================================================
// Types
// ============================================================================

/// 질의 옵션
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// 검색할 문서 수
    pub top_k: usize,
    /// 질문/프롬프트 언어 코드 (en, de)
    pub lang: String,
    /// 문장 레코드에서 본문으로 사용할 필드
    pub content_key: String,
    /// 문장 레코드에서 메타데이터로 복사할 필드
    pub meta_keys: Vec<String>,
    /// 폴백 검색 유사도 함수
    pub similarity: SimilarityFunction,
    /// 폴백 검색 스코어를 0~1로 스케일링할지 여부
    pub scale_score: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            lang: Language::default().code().to_string(),
            content_key: "statement".to_string(),
            meta_keys: vec!["qid".to_string(), "pid".to_string(), "value".to_string()],
            similarity: SimilarityFunction::Cosine,
            scale_score: false,
        }
    }
}

/// 검색 결과 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    VectorStore,
    Fallback,
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VectorStore => write!(f, "vector store"),
            Self::Fallback => write!(f, "wikidata fallback"),
        }
    }
}

/// 검색 단계 결과
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub documents: Vec<Document>,
    pub source: RetrievalSource,
}

// ============================================================================
// RagPipeline
// ============================================================================

/// 검색 증강 생성 파이프라인
pub struct RagPipeline {
    vector_store: Option<Arc<dyn VectorStore>>,
    statements: Arc<dyn StatementSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn ChatModel>,
}

impl RagPipeline {
    pub fn new(
        vector_store: Option<Arc<dyn VectorStore>>,
        statements: Arc<dyn StatementSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            vector_store,
            statements,
            embedder,
            llm,
        }
    }

    /// 설정으로부터 모든 구성요소 생성
    ///
    /// # Arguments
    /// * `config` - 환경변수 설정
    /// * `use_vector_store` - false면 Astra 설정이 있어도 항상 폴백 경로 사용
    /// * `fetch` - Wikidata 수집 옵션
    pub fn from_config(config: &Config, use_vector_store: bool, fetch: FetchOptions) -> Result<Self> {
        let vector_store: Option<Arc<dyn VectorStore>> = match (&config.astra, use_vector_store) {
            (Some(astra), true) => Some(Arc::new(
                AstraVectorStore::new(astra).context("Failed to create Astra DB client")?,
            )),
            (None, true) => {
                tracing::info!("Astra DB not configured, using Wikidata fallback only");
                None
            }
            (_, false) => None,
        };

        let statements = Arc::new(StatementFetcher::from_config(config, fetch)?);
        let embedder = create_embedder(&config.embedding).context("Failed to create embedder")?;
        let llm = create_chat_model(&config.llm).context("Failed to create language model")?;

        Ok(Self::new(vector_store, statements, embedder, llm))
    }

    /// 검색 단계
    ///
    /// 벡터 스토어 실패는 경고 후 폴백으로 넘어가고,
    /// 폴백 경로(문장 수집, 임베딩)의 실패는 그대로 전파됩니다.
    pub async fn retrieve(&self, query: &str, options: &QueryOptions) -> Result<Retrieval> {
        if let Some(store) = &self.vector_store {
            match store.similarity_search(query, options.top_k).await {
                Ok(documents) if !documents.is_empty() => {
                    tracing::info!("{}: {} documents", store.name(), documents.len());
                    return Ok(Retrieval {
                        documents,
                        source: RetrievalSource::VectorStore,
                    });
                }
                Ok(_) => tracing::info!("{}: no results, falling back to Wikidata", store.name()),
                Err(e) => tracing::warn!(
                    "{} failed, falling back to Wikidata: {:#}",
                    store.name(),
                    e
                ),
            }
        }

        let documents = self.fallback_retrieve(query, options).await?;
        Ok(Retrieval {
            documents,
            source: RetrievalSource::Fallback,
        })
    }

    /// 폴백 검색: Wikidata 문장 수집 → 임베딩 → 인메모리 검색
    async fn fallback_retrieve(&self, query: &str, options: &QueryOptions) -> Result<Vec<Document>> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let statements = self
            .statements
            .statements_for_query(query, &options.lang)
            .await
            .context("Failed to fetch Wikidata statements")?;

        tracing::debug!("wikidata statements: {}", statements.len());
        for statement in &statements {
            tracing::debug!("  {:?}", statement);
        }

        if statements.is_empty() {
            tracing::warn!("No Wikidata statements for query, answering without context");
            return Ok(Vec::new());
        }

        let records = statements
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to serialize statements")?;

        let store = InMemoryDocumentStore::from_records(
            &records,
            &options.content_key,
            &options.meta_keys,
            self.embedder.as_ref(),
            options.similarity,
        )
        .await?;

        Ok(store.embedding_retrieval(&query_embedding, options.top_k, options.scale_score))
    }

    /// 질문 하나를 처리해 첫 번째 답변 반환
    pub async fn process_query(&self, query: &str, options: &QueryOptions) -> Result<GeneratedAnswer> {
        // 네트워크 호출 전에 언어 검증
        let lang: Language = options.lang.parse()?;

        let retrieval = self.retrieve(query, options).await?;

        tracing::debug!("retriever results ({}):", retrieval.source);
        for doc in &retrieval.documents {
            tracing::debug!("  [{:?}] {}", doc.score, doc.content);
        }

        let prompt = render_user_prompt(lang, query, &retrieval.documents);
        tracing::debug!("prompt: {}", prompt);

        let messages = [
            ChatMessage::system(system_prompt(lang)),
            ChatMessage::user(prompt),
        ];

        let replies = self
            .llm
            .chat(&messages)
            .await
            .with_context(|| format!("Language model {} failed", self.llm.name()))?;
        tracing::debug!("llm replies: {:?}", replies);

        let answer = AnswerBuilder::first(query, replies, &retrieval.documents)?;
        tracing::debug!("answer: {:?}", answer);
        Ok(answer)
    }
}

// ============================================================================
// Tests
// ============================================================================
