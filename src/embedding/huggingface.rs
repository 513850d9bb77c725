//! HuggingFace Inference 임베딩
//!
//! sentence-transformers 계열 모델을 feature-extraction 파이프라인으로 호출합니다.
//! ref: https://huggingface.co/docs/inference-providers/tasks/feature-extraction

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::EmbeddingProvider;
use crate::error::RagError;

const HF_INFERENCE_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// 한 요청에 보낼 최대 입력 수
const MAX_BATCH: usize = 64;

/// HuggingFace feature-extraction 임베딩
#[derive(Debug)]
pub struct HuggingFaceEmbedding {
    token: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    normalize: bool,
}

impl HuggingFaceEmbedding {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `token` - HuggingFace access token (`HF_TOKEN`)
    /// * `model` - 모델 ID (예: svalabs/german-gpl-adapted-covid)
    pub fn new(token: String, model: String) -> Result<Self> {
        let endpoint = format!(
            "{}/{}/pipeline/feature-extraction",
            HF_INFERENCE_BASE, model
        );
        Self::with_endpoint(token, model, endpoint)
    }

    /// 엔드포인트를 직접 지정 (Inference Endpoints / TEI 서버)
    fn with_endpoint(token: String, model: String, endpoint: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            token,
            model,
            endpoint,
            client,
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&FeatureExtractionRequest {
                inputs,
                normalize: false,
            })
            .send()
            .await
            .context("Failed to send feature-extraction request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("HuggingFace API error ({}): {}", status, body);
        }

        let value: Value =
            serde_json::from_str(&body).context("Failed to parse feature-extraction response")?;
        Ok(parse_feature_extraction(&value, inputs.len())?)
    }
}

/// feature-extraction 응답 파싱
///
/// 문장 임베딩(`[[f32]]`)은 그대로, 토큰 임베딩(`[[[f32]]]`)은 평균 풀링합니다.
fn parse_feature_extraction(value: &Value, expected: usize) -> Result<Vec<Vec<f32>>, RagError> {
    let malformed = |message: &str| RagError::MalformedResponse {
        service: "huggingface",
        message: message.to_string(),
    };

    let rows = value
        .as_array()
        .ok_or_else(|| malformed("expected a JSON array"))?;

    let vectors = rows
        .iter()
        .map(|row| match row {
            Value::Array(items) if items.first().map_or(false, Value::is_array) => {
                let tokens = items
                    .iter()
                    .map(to_vector)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| malformed("token embedding is not numeric"))?;
                Ok(mean_pool(&tokens))
            }
            other => to_vector(other).ok_or_else(|| malformed("embedding is not numeric")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if vectors.len() != expected {
        return Err(malformed(&format!(
            "got {} embeddings for {} inputs",
            vectors.len(),
            expected
        )));
    }

    Ok(vectors)
}

fn to_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = tokens.first() else {
        return Vec::new();
    };
    let mut sum = vec![0.0f32; first.len()];
    for token in tokens {
        for (acc, v) in sum.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let n = tokens.len() as f32;
    sum.iter_mut().for_each(|v| *v /= n);
    sum
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty response from HuggingFace"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            results.extend(self.request(batch).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        // 모델에 따라 다르며 첫 응답 전에는 알 수 없음
        0
    }

    fn name(&self) -> &str {
        &self.model
    }
}
