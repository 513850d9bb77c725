//! Vector Store - 벡터 검색 트레이트 및 유사도 함수
//!
//! 원격 벡터 스토어(Astra DB)와 인메모리 폴백 검색기가 공유하는
//! 인터페이스와 유틸리티입니다.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;

use super::document::Document;

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
///
/// 원시 쿼리 문자열로 유사도 검색을 수행하는 1차 검색기입니다.
/// 임베딩은 스토어 쪽에서 처리합니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 쿼리와 유사한 문서 최대 `k`개 (스코어 내림차순)
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;

    /// 스토어 이름 (로그용)
    fn name(&self) -> &str;
}

// ============================================================================
// Similarity Function
// ============================================================================

/// 임베딩 유사도 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityFunction {
    #[default]
    Cosine,
    DotProduct,
}

impl SimilarityFunction {
    /// 두 벡터의 유사도
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::DotProduct => dot_product(a, b),
        }
    }

    /// 스코어를 0.0 ~ 1.0으로 스케일링
    ///
    /// - cosine: (s + 1) / 2
    /// - dot product: sigmoid(s / 100)
    pub fn scale(&self, score: f32) -> f32 {
        match self {
            Self::Cosine => (score + 1.0) / 2.0,
            Self::DotProduct => 1.0 / (1.0 + (-score / 100.0).exp()),
        }
    }
}

impl FromStr for SimilarityFunction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot_product" | "dot-product" | "dot" => Ok(Self::DotProduct),
            other => anyhow::bail!(
                "Invalid similarity function: {}. Must be cosine or dot_product",
                other
            ),
        }
    }
}

impl fmt::Display for SimilarityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::DotProduct => write!(f, "dot_product"),
        }
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다.
/// 길이가 다르거나 영벡터면 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// 내적
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatched() {
        let a: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&a, &a), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_dot_product() {
        assert_eq!(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot_product(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_scale_scores() {
        assert!((SimilarityFunction::Cosine.scale(1.0) - 1.0).abs() < 1e-6);
        assert!((SimilarityFunction::Cosine.scale(-1.0)).abs() < 1e-6);
        assert!((SimilarityFunction::DotProduct.scale(0.0) - 0.5).abs() < 1e-6);
        assert!(SimilarityFunction::DotProduct.scale(500.0) > 0.99);
    }

    #[test]
    fn test_parse_similarity_function() {
        assert_eq!(
            "cosine".parse::<SimilarityFunction>().unwrap(),
            SimilarityFunction::Cosine
        );
        assert_eq!(
            "DOT_PRODUCT".parse::<SimilarityFunction>().unwrap(),
            SimilarityFunction::DotProduct
        );
        assert!("euclidean".parse::<SimilarityFunction>().is_err());
        assert_eq!(SimilarityFunction::DotProduct.to_string(), "dot_product");
    }
}
