//! Document - 검색 단위
//!
//! 벡터 스토어 검색 결과와 Wikidata 문장 모두 이 타입으로 통일됩니다.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// 검색 문서
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 콘텐츠 + 메타데이터의 SHA-256 (hex)
    pub id: String,
    /// 본문
    pub content: String,
    /// 검색 스코어 (검색 전에는 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// 메타데이터 (qid, pid, value 등)
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// 임베딩 벡터
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// 새 문서 생성 (id는 내용으로부터 계산)
    pub fn new(content: impl Into<String>, meta: Map<String, Value>) -> Self {
        let content = content.into();
        let id = document_id(&content, &meta);
        Self {
            id,
            content,
            score: None,
            meta,
            embedding: None,
        }
    }

    /// 스코어 지정
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// 평탄한 JSON 레코드에서 문서 생성
    ///
    /// # Arguments
    /// * `record` - JSON 객체 (예: Wikidata 문장)
    /// * `content_key` - 본문으로 사용할 필드
    /// * `meta_keys` - 메타데이터로 복사할 필드 (없는 필드는 건너뜀)
    pub fn from_record(record: &Value, content_key: &str, meta_keys: &[String]) -> Result<Self> {
        let object = record
            .as_object()
            .context("Document record must be a JSON object")?;

        let content = match object.get(content_key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                anyhow::bail!("Record has no content field '{}'", content_key)
            }
            Some(other) => other.to_string(),
        };

        let meta = meta_keys
            .iter()
            .filter_map(|key| object.get(key).map(|v| (key.clone(), v.clone())))
            .collect();

        Ok(Self::new(content, meta))
    }

    /// 메타데이터 문자열 값 조회
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

/// 문서 ID 계산
fn document_id(content: &str, meta: &Map<String, Value>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    // serde_json::Map은 키 순서가 정렬되어 있어 결과가 안정적
    hasher.update(Value::Object(meta.clone()).to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_id_is_stable() {
        let a = Document::new("Albert Einstein sex or gender male", Map::new());
        let b = Document::new("Albert Einstein sex or gender male", Map::new());
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
    }

    #[test]
    fn test_id_depends_on_meta() {
        let mut meta = Map::new();
        meta.insert("qid".to_string(), json!("Q937"));
        let a = Document::new("same", Map::new());
        let b = Document::new("same", meta);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_from_record() {
        let record = json!({
            "statement": "Albert Einstein award received Nobel Prize in Physics",
            "qid": "Q937",
            "pid": "P166",
            "value": "Nobel Prize in Physics"
        });
        let doc = Document::from_record(&record, "statement", &keys(&["qid", "pid", "missing"]))
            .expect("valid record");

        assert_eq!(
            doc.content,
            "Albert Einstein award received Nobel Prize in Physics"
        );
        assert_eq!(doc.meta_str("qid"), Some("Q937"));
        assert_eq!(doc.meta_str("pid"), Some("P166"));
        assert!(!doc.meta.contains_key("missing"));
        assert!(!doc.meta.contains_key("value"));
        assert!(doc.score.is_none());
    }

    #[test]
    fn test_from_record_non_string_content() {
        let record = json!({ "n": 42 });
        let doc = Document::from_record(&record, "n", &[]).expect("valid record");
        assert_eq!(doc.content, "42");
    }

    #[test]
    fn test_from_record_missing_content() {
        let record = json!({ "qid": "Q1" });
        assert!(Document::from_record(&record, "statement", &[]).is_err());
        assert!(Document::from_record(&json!("text"), "statement", &[]).is_err());
    }
}
