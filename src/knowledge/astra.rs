//! Astra DB Vector Store - 호스팅 벡터 검색 (1차 검색기)
//!
//! Data API의 `find` 명령을 `$vectorize` 정렬로 호출합니다.
//! 컬렉션에 연결된 임베딩 서비스(NV-Embed-QA)가 서버 쪽에서 쿼리를 벡터화하므로
//! 클라이언트는 임베딩 모델이 필요 없습니다.
//!
//! ref: https://docs.datastax.com/en/astra-db-serverless/api-reference/document-methods/find-many.html

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::AstraConfig;
use crate::error::RagError;

use super::document::Document;
use super::vector::VectorStore;

/// Data API 버전 경로
const DATA_API_PATH: &str = "api/json/v1";

/// Astra DB 벡터 스토어
pub struct AstraVectorStore {
    client: reqwest::Client,
    collection_url: String,
    token: String,
    name: String,
}

impl AstraVectorStore {
    /// 설정으로부터 생성
    pub fn new(config: &AstraConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let collection_url = format!(
            "{}/{}/{}/{}",
            config.api_endpoint.trim_end_matches('/'),
            DATA_API_PATH,
            config.keyspace,
            config.collection
        );

        Ok(Self {
            client,
            collection_url,
            token: config.token.clone(),
            name: format!("astra:{}", config.collection),
        })
    }

    /// `find` 명령 본문
    fn find_command(query: &str, k: usize) -> Value {
        json!({
            "find": {
                "sort": { "$vectorize": query },
                "projection": { "content": 1, "$vectorize": 1, "metadata": 1 },
                "options": {
                    "limit": k,
                    "includeSimilarity": true
                }
            }
        })
    }
}

/// `find` 응답을 문서 목록으로 변환
///
/// 본문은 `content`, 없으면 `$vectorize` (서버 측 임베딩 컬렉션은 원문을 여기에 저장)에서 읽습니다.
/// 본문이나 `metadata.QID`가 없는 결과가 하나라도 있으면 전체를 실패로 처리합니다.
/// `$similarity`가 없으면 점수는 비워 둡니다.
fn parse_find_response(body: &Value) -> Result<Vec<Document>, RagError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(RagError::VectorStore(messages.join("; ")));
        }
    }

    let documents = body
        .pointer("/data/documents")
        .and_then(Value::as_array)
        .ok_or_else(|| RagError::MalformedResponse {
            service: "astra",
            message: "missing data.documents".to_string(),
        })?;

    documents
        .iter()
        .map(|hit| {
            let content = ["content", "$vectorize"]
                .iter()
                .filter_map(|key| hit.get(*key).and_then(Value::as_str))
                .find(|text| !text.trim().is_empty())
                .ok_or_else(|| RagError::VectorStore("hit without content".to_string()))?;
            let qid = hit
                .pointer("/metadata/QID")
                .and_then(Value::as_str)
                .ok_or_else(|| RagError::VectorStore("hit without metadata.QID".to_string()))?;

            let mut meta = Map::new();
            meta.insert("qid".to_string(), Value::String(qid.to_string()));
            let doc = Document::new(content, meta);
            Ok(match hit.get("$similarity").and_then(Value::as_f64) {
                Some(score) => doc.with_score(score as f32),
                None => doc,
            })
        })
        .collect()
}

#[async_trait]
impl VectorStore for AstraVectorStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        tracing::debug!("Astra find: k={} url={}", k, self.collection_url);

        let response = self
            .client
            .post(&self.collection_url)
            .header("Token", &self.token)
            .json(&Self::find_command(query, k))
            .send()
            .await
            .context("Failed to send Astra DB request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Astra DB response")?;

        if !status.is_success() {
            return Err(RagError::VectorStore(format!("HTTP {}: {}", status, body)).into());
        }

        let value: Value =
            serde_json::from_str(&body).context("Failed to parse Astra DB response")?;
        Ok(parse_find_response(&value)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
