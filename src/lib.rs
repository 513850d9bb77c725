//! wikidata-rag - Wikidata 기반 RAG 질의응답
//!
//! 벡터 스토어(Astra DB) 검색을 먼저 시도하고, 결과가 없으면
//! Wikidata에서 관련 문장을 즉석으로 수집해 인메모리 검색으로 보완한 뒤
//! 언어 모델로 답변을 생성합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let config = Config::from_env();
//! let pipeline = RagPipeline::from_config(&config, true, FetchOptions::default())?;
//! let answer = pipeline.process_query("Wer ist Albert Einstein?", &QueryOptions::default()).await?;
//! println!("{}", answer.data);
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;
pub mod textification;
pub mod wikidata;

/// Wikimedia API 정책상 필요한 User-Agent
pub const USER_AGENT: &str = concat!(
    "wikidata-rag/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/PALAN-K/wikidata-rag)"
);

// Re-exports
pub use config::Config;
pub use embedding::{create_embedder, EmbeddingProvider, GeminiEmbedding, HuggingFaceEmbedding};
pub use error::RagError;
pub use knowledge::{
    AstraVectorStore, Document, InMemoryDocumentStore, SimilarityFunction, VectorStore,
};
pub use llm::{create_chat_model, AnswerBuilder, ChatMessage, ChatModel, GeneratedAnswer};
pub use pipeline::{QueryOptions, RagPipeline, Retrieval, RetrievalSource};
pub use prompt::Language;
pub use search::{EntitySearch, SerpApiSearch, WikidataSearch};
pub use textification::{FetchOptions, StatementFetcher, StatementSource};
pub use wikidata::{EntitySource, Statement, WikidataClient};
