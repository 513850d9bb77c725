//! 설정 모듈 - 환경변수 기반 구성
//!
//! 모든 외부 서비스(검색 API, Wikidata, 벡터 스토어, 임베딩, LLM)의
//! 접속 정보를 환경변수에서 읽습니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let config = Config::from_env();
//! if let Some(astra) = &config.astra { ... }
//! ```

use std::time::Duration;

use crate::error::RagError;

// ============================================================================
// Defaults
// ============================================================================

/// Wikidata MediaWiki 기본 경로
pub const DEFAULT_WIKIDATA_API_URL: &str = "https://www.wikidata.org/w";

/// 검색 쿼리에 붙는 사이트 제한 (따옴표 포함)
pub const DEFAULT_WIKIDATA_BASE: &str = "\"wikidata.org\"";

/// Wikidata 요청 타임아웃 (초)
pub const DEFAULT_WIKIDATA_TIMEOUT_SECS: u64 = 10;

/// HuggingFace 기본 임베딩 모델
pub const DEFAULT_HF_EMBEDDING_MODEL: &str = "svalabs/german-gpl-adapted-covid";

/// Gemini 기본 임베딩 모델
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// Astra DB 기본 컬렉션
pub const DEFAULT_COLLECTION_NAME: &str = "wikidata";

/// Astra DB 기본 키스페이스
pub const DEFAULT_KEYSPACE: &str = "default_keyspace";

/// LLM 최대 생성 토큰 수
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

// ============================================================================
// Types
// ============================================================================

/// 임베딩 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    HuggingFace,
    Gemini,
}

/// LLM 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    /// HuggingFace router (OpenAI 호환)
    HuggingFace,
    /// OpenAI 또는 호환 서버 (Ollama 등)
    OpenAi,
    Gemini,
}

/// 임베딩 설정
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub api_key: Option<String>,
}

/// LLM 설정
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
}

/// Astra DB 벡터 스토어 설정
#[derive(Debug, Clone)]
pub struct AstraConfig {
    pub api_endpoint: String,
    pub token: String,
    pub keyspace: String,
    pub collection: String,
}

/// Wikidata 접속 설정
#[derive(Debug, Clone)]
pub struct WikidataConfig {
    pub api_url: String,
    pub wikidata_base: String,
    pub timeout: Duration,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_WIKIDATA_API_URL.to_string(),
            wikidata_base: DEFAULT_WIKIDATA_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_WIKIDATA_TIMEOUT_SECS),
        }
    }
}

/// 전체 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub serpapi_api_key: Option<String>,
    pub wikidata: WikidataConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    /// 토큰과 엔드포인트가 모두 있을 때만 설정됨
    pub astra: Option<AstraConfig>,
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// 프로세스 환경변수에서 로드
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 로드 (빈 문자열은 미설정으로 취급)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // SERAPI_API_KEY는 예전 이름
        let serpapi_api_key = get("SERPAPI_API_KEY").or_else(|| get("SERAPI_API_KEY"));
        let hf_token = get("HF_TOKEN");
        let gemini_key = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_AI_API_KEY"));

        let timeout_secs = get("WIKIDATA_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_WIKIDATA_TIMEOUT_SECS);

        let wikidata = WikidataConfig {
            api_url: get("WIKIDATA_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_WIKIDATA_API_URL.to_string()),
            wikidata_base: DEFAULT_WIKIDATA_BASE.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };

        let embedding_backend = match get("EMBEDDING_PROVIDER").as_deref() {
            Some(p) if p.eq_ignore_ascii_case("gemini") => EmbeddingBackend::Gemini,
            Some(p) if !p.eq_ignore_ascii_case("huggingface") => {
                tracing::warn!("Unknown EMBEDDING_PROVIDER '{}', using huggingface", p);
                EmbeddingBackend::HuggingFace
            }
            _ => EmbeddingBackend::HuggingFace,
        };

        let embedding = match embedding_backend {
            EmbeddingBackend::HuggingFace => EmbeddingConfig {
                backend: embedding_backend,
                model: get("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_HF_EMBEDDING_MODEL.to_string()),
                api_key: hf_token.clone(),
            },
            EmbeddingBackend::Gemini => EmbeddingConfig {
                backend: embedding_backend,
                model: get("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_EMBEDDING_MODEL.to_string()),
                api_key: gemini_key.clone(),
            },
        };

        let llm_backend = match get("LLM_PROVIDER").map(|p| p.to_lowercase()).as_deref() {
            Some("openai") => LlmBackend::OpenAi,
            Some("gemini") => LlmBackend::Gemini,
            _ => LlmBackend::HuggingFace,
        };

        let (default_model, default_base, provider_key) = match llm_backend {
            LlmBackend::HuggingFace => (
                "meta-llama/Llama-3.1-8B-Instruct",
                "https://router.huggingface.co/v1",
                hf_token,
            ),
            LlmBackend::OpenAi => ("gpt-4o-mini", "https://api.openai.com/v1", get("OPENAI_API_KEY")),
            LlmBackend::Gemini => (
                "gemini-2.0-flash",
                "https://generativelanguage.googleapis.com/v1beta",
                gemini_key,
            ),
        };

        let llm = LlmConfig {
            backend: llm_backend,
            model: get("LLM_MODEL").unwrap_or_else(|| default_model.to_string()),
            base_url: get("LLM_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default_base.to_string()),
            api_key: get("LLM_API_KEY").or(provider_key),
            max_tokens: get("LLM_MAX_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
        };

        let astra = match (get("ASTRA_DB_API_ENDPOINT"), get("ASTRA_DB_APPLICATION_TOKEN")) {
            (Some(api_endpoint), Some(token)) => Some(AstraConfig {
                api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
                token,
                keyspace: get("ASTRA_DB_KEYSPACE").unwrap_or_else(|| DEFAULT_KEYSPACE.to_string()),
                collection: get("COLLECTION_NAME")
                    .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            }),
            _ => None,
        };

        Self {
            serpapi_api_key,
            wikidata,
            embedding,
            llm,
            astra,
        }
    }
}

impl EmbeddingConfig {
    /// 임베딩 API 키 (없으면 설정 안내 에러)
    pub fn require_api_key(&self) -> Result<&str, RagError> {
        let name = match self.backend {
            EmbeddingBackend::HuggingFace => "HF_TOKEN",
            EmbeddingBackend::Gemini => "GEMINI_API_KEY",
        };
        self.api_key
            .as_deref()
            .ok_or(RagError::MissingCredential(name))
    }
}

/// 사용 가능한 CPU 코어 수 (엔티티 병렬 수집 기본값)
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

// ============================================================================
// Tests
// ============================================================================
