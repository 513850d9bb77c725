//! 인메모리 문서 저장소 - 폴백 검색용
//!
//! Wikidata에서 즉석으로 가져온 문장을 임베딩해 두고
//! 브루트포스 최근접 이웃 검색을 수행합니다.
//! 질의 하나마다 새로 만들고 버리는 일회용 저장소입니다.

use std::cmp::Ordering;
use std::collections::HashSet;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::embedding::EmbeddingProvider;

use super::document::Document;
use super::vector::SimilarityFunction;

/// 인메모리 임베딩 검색 저장소
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    documents: Vec<Document>,
    similarity: SimilarityFunction,
}

impl InMemoryDocumentStore {
    /// 빈 저장소
    pub fn new(similarity: SimilarityFunction) -> Self {
        Self {
            documents: Vec::new(),
            similarity,
        }
    }

    /// 레코드 목록으로부터 문서를 만들고 임베딩하여 저장소 생성
    ///
    /// # Arguments
    /// * `records` - 평탄한 JSON 레코드 (Wikidata 문장)
    /// * `content_key` - 본문 필드
    /// * `meta_keys` - 메타데이터 필드
    /// * `embedder` - 문서 임베딩에 사용할 프로바이더
    /// * `similarity` - 검색 시 사용할 유사도 함수
    pub async fn from_records(
        records: &[Value],
        content_key: &str,
        meta_keys: &[String],
        embedder: &dyn EmbeddingProvider,
        similarity: SimilarityFunction,
    ) -> Result<Self> {
        let documents = records
            .iter()
            .map(|r| Document::from_record(r, content_key, meta_keys))
            .collect::<Result<Vec<_>>>()?;

        let mut store = Self::new(similarity);
        store.write_documents(documents, embedder).await?;
        Ok(store)
    }

    /// 문서 임베딩 후 저장 (같은 id는 한 번만 저장)
    pub async fn write_documents(
        &mut self,
        documents: Vec<Document>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<usize> {
        let mut seen: HashSet<String> = self.documents.iter().map(|d| d.id.clone()).collect();
        let fresh: Vec<Document> = documents
            .into_iter()
            .filter(|doc| seen.insert(doc.id.clone()))
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = fresh.iter().map(|d| d.content.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed documents")?;

        if embeddings.len() != fresh.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} documents",
                embeddings.len(),
                fresh.len()
            );
        }

        let written = fresh.len();
        for (mut doc, embedding) in fresh.into_iter().zip(embeddings) {
            doc.embedding = Some(embedding);
            self.documents.push(doc);
        }

        tracing::debug!(
            "In-memory store: wrote {} documents (total {})",
            written,
            self.documents.len()
        );
        Ok(written)
    }

    /// 임베딩 기반 검색
    ///
    /// 스코어 내림차순으로 최대 `top_k`개를 반환합니다.
    /// 반환 문서에는 임베딩이 포함되지 않습니다.
    pub fn embedding_retrieval(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        scale_score: bool,
    ) -> Vec<Document> {
        let mut scored: Vec<(f32, &Document)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let embedding = doc.embedding.as_deref()?;
                let mut score = self.similarity.score(query_embedding, embedding);
                if scale_score {
                    score = self.similarity.scale(score);
                }
                Some((score, doc))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(score, doc)| {
                let mut result = doc.clone().with_score(score);
                result.embedding = None;
                result
            })
            .collect()
    }

    /// 저장된 문서 수
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
