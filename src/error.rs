//! 에러 타입
//!
//! 호출자가 구분해서 처리해야 하는 실패만 정의합니다.
//! 나머지는 `anyhow::Error` + `.context()`로 전파합니다.

use thiserror::Error;

/// RAG 파이프라인 에러
#[derive(Error, Debug)]
pub enum RagError {
    /// 프롬프트가 준비되지 않은 언어
    #[error("unsupported language: {0} (supported: en, de)")]
    UnsupportedLanguage(String),

    /// 벡터 스토어 검색 실패 (폴백 대상)
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// 필수 자격 증명 누락
    #[error("{0} not set")]
    MissingCredential(&'static str),

    /// LLM이 응답을 돌려주지 않음
    #[error("language model returned no replies")]
    EmptyReply,

    /// 외부 API 응답 형식 오류
    #[error("malformed response from {service}: {message}")]
    MalformedResponse {
        service: &'static str,
        message: String,
    },
}
