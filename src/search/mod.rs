//! 검색 모듈 - 질문과 관련된 Wikidata 엔티티 찾기
//!
//! - SerpApiSearch: Google 검색 결과에서 wikidata.org 링크 추출
//! - WikidataSearch: SerpAPI 키가 없을 때 Wikidata 자체 검색 (wbsearchentities)

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::config::WikidataConfig;
use crate::error::RagError;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

// ============================================================================
// EntitySearch Trait
// ============================================================================

/// 엔티티 검색 트레이트
#[async_trait]
pub trait EntitySearch: Send + Sync {
    /// 질문과 관련된 엔티티 ID 목록 (검색 순위 순, 중복 없음)
    async fn search_entities(&self, question: &str, lang: &str, limit: usize)
        -> Result<Vec<String>>;

    /// 검색 엔진 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Entity ID Extraction
// ============================================================================

fn entity_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^/(?:wiki|entity)/(?:Property:)?([QP][1-9][0-9]*)$")
            .expect("entity path regex is valid")
    })
}

/// Wikidata 엔티티 ID 형식 검사 (Q42, P31)
pub fn is_entity_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('Q') | Some('P'))
        && id.len() > 1
        && !id[1..].starts_with('0')
        && id[1..].chars().all(|c| c.is_ascii_digit())
}

/// wikidata.org 또는 그 서브도메인
fn is_wikidata_host(host: &str) -> bool {
    host == "wikidata.org" || host.ends_with(".wikidata.org")
}

/// 링크 목록에서 엔티티 ID 추출
///
/// `https://www.wikidata.org/wiki/Q42`, `.../wiki/Property:P31`,
/// `http://www.wikidata.org/entity/Q42` 형식을 인식합니다.
/// 처음 나온 순서를 유지하며 중복은 제거합니다.
pub fn extract_entity_ids<I, S>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for link in links {
        let Ok(url) = Url::parse(link.as_ref()) else {
            continue;
        };
        if !url.host_str().map_or(false, is_wikidata_host) {
            continue;
        }
        if let Some(caps) = entity_path_regex().captures(url.path()) {
            let id = caps[1].to_string();
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }

    ids
}

// ============================================================================
// SerpAPI
// ============================================================================

/// SerpAPI Google 검색
pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: String,
    /// 사이트 제한 (예: `"wikidata.org"`)
    site: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: Option<String>,
}

impl SerpApiSearch {
    /// 새 검색기 생성
    pub fn new(api_key: String, site: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            site,
        })
    }

    /// 검색 쿼리 문자열
    fn query_string(&self, question: &str) -> String {
        format!("{} site:{}", question.trim(), self.site)
    }
}

/// SerpAPI 응답에서 링크 추출
fn serpapi_links(body: &str) -> Result<Vec<String>> {
    let response: SerpApiResponse =
        serde_json::from_str(body).context("Failed to parse SerpAPI response")?;

    if let Some(error) = response.error {
        // 결과 없음은 에러가 아니라 빈 목록
        if error.contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        return Err(RagError::MalformedResponse {
            service: "serpapi",
            message: error,
        }
        .into());
    }

    Ok(response
        .organic_results
        .into_iter()
        .filter_map(|r| r.link)
        .collect())
}

#[async_trait]
impl EntitySearch for SerpApiSearch {
    async fn search_entities(
        &self,
        question: &str,
        lang: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let q = self.query_string(question);
        tracing::debug!("SerpAPI query: {}", q);

        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google"),
                ("q", q.as_str()),
                ("hl", lang),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to send SerpAPI request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read SerpAPI response")?;
        if !status.is_success() && !body.contains("\"error\"") {
            anyhow::bail!("SerpAPI error ({}): {}", status, body);
        }

        let links = serpapi_links(&body)?;
        let mut ids = extract_entity_ids(&links);
        ids.truncate(limit);

        tracing::info!("SerpAPI: {} links, {} entities", links.len(), ids.len());
        Ok(ids)
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

// ============================================================================
// Wikidata wbsearchentities
// ============================================================================

/// Wikidata 자체 엔티티 검색
pub struct WikidataSearch {
    client: reqwest::Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct WbSearchResponse {
    #[serde(default)]
    search: Vec<WbSearchHit>,
}

#[derive(Debug, Deserialize)]
struct WbSearchHit {
    id: String,
}

impl WikidataSearch {
    /// 새 검색기 생성
    pub fn new(config: &WikidataConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// 질문에서 검색어 추출
///
/// wbsearchentities는 레이블 접두어 검색이므로 의문사 등을 제거하고
/// 대문자로 시작하는 단어(고유명사)를 우선 사용합니다.
fn search_terms(question: &str) -> String {
    let words: Vec<&str> = question
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();

    let proper: Vec<&str> = words
        .iter()
        .skip(1)
        .copied()
        .filter(|w| w.chars().next().map_or(false, char::is_uppercase))
        .collect();

    if proper.is_empty() {
        words.join(" ")
    } else {
        proper.join(" ")
    }
}

#[async_trait]
impl EntitySearch for WikidataSearch {
    async fn search_entities(
        &self,
        question: &str,
        lang: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let terms = search_terms(question);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.clamp(1, 50).to_string();

        let url = format!("{}/api.php", self.api_url);
        let response: WbSearchResponse = self
            .client
            .get(&url)
            .query(&[
                ("action", "wbsearchentities"),
                ("search", terms.as_str()),
                ("language", lang),
                ("uselang", lang),
                ("type", "item"),
                ("format", "json"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("Failed to send wbsearchentities request")?
            .error_for_status()
            .context("wbsearchentities request failed")?
            .json()
            .await
            .context("Failed to parse wbsearchentities response")?;

        let ids: Vec<String> = response
            .search
            .into_iter()
            .map(|hit| hit.id)
            .filter(|id| is_entity_id(id))
            .collect();

        tracing::info!("Wikidata search '{}': {} entities", terms, ids.len());
        Ok(ids)
    }

    fn name(&self) -> &str {
        "wikidata"
    }
}

// ============================================================================
// Tests
// ============================================================================
