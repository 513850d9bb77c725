//! Knowledge 모듈 - 검색 문서와 검색기
//!
//! - Document: 검색 단위 (본문 + 스코어 + 메타데이터)
//! - Astra: 호스팅 벡터 스토어 (1차 검색)
//! - Memory: 즉석 임베딩 + 브루트포스 최근접 이웃 (폴백 검색)

mod astra;
mod document;
mod memory;
mod vector;

// Re-exports
pub use astra::AstraVectorStore;
pub use document::Document;
pub use memory::InMemoryDocumentStore;
pub use vector::{cosine_similarity, dot_product, SimilarityFunction, VectorStore};
