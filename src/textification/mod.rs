//! Textification - 질문 → Wikidata 문장 목록
//!
//! 1. 검색 엔진으로 질문과 관련된 엔티티 ID를 찾고
//! 2. 엔티티별 문장을 병렬로 가져와 (동시 요청 수 제한)
//! 3. 검색 순위 순서대로 이어 붙입니다.
//!
//! 개별 엔티티 실패는 경고 로그만 남기고 건너뜁니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::config::{default_concurrency, Config};
use crate::search::{EntitySearch, SerpApiSearch, WikidataSearch};
use crate::wikidata::{EntitySource, Statement, WikidataClient};

/// 질문당 기본 최대 엔티티 수
pub const DEFAULT_MAX_ENTITIES: usize = 10;

// ============================================================================
// StatementSource Trait
// ============================================================================

/// 질문에 대한 문장 목록을 제공하는 소스
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn statements_for_query(&self, question: &str, lang: &str) -> Result<Vec<Statement>>;
}

// ============================================================================
// StatementFetcher
// ============================================================================

/// 수집 옵션
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// 엔티티 병렬 수집 수 (기본: CPU 코어 수)
    pub concurrency: usize,
    /// 검색 결과에서 사용할 최대 엔티티 수
    pub max_entities: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_entities: DEFAULT_MAX_ENTITIES,
        }
    }
}

/// 검색 + 엔티티 소스 조합
pub struct StatementFetcher {
    search: Arc<dyn EntitySearch>,
    entities: Arc<dyn EntitySource>,
    options: FetchOptions,
}

impl StatementFetcher {
    pub fn new(
        search: Arc<dyn EntitySearch>,
        entities: Arc<dyn EntitySource>,
        options: FetchOptions,
    ) -> Self {
        Self {
            search,
            entities,
            options,
        }
    }

    /// 설정으로부터 생성
    ///
    /// SerpAPI 키가 있으면 SerpAPI, 없으면 Wikidata 자체 검색을 사용합니다.
    pub fn from_config(config: &Config, options: FetchOptions) -> Result<Self> {
        let search: Arc<dyn EntitySearch> = match &config.serpapi_api_key {
            Some(key) => Arc::new(
                SerpApiSearch::new(
                    key.clone(),
                    config.wikidata.wikidata_base.clone(),
                    config.wikidata.timeout,
                )
                .context("Failed to create SerpAPI client")?,
            ),
            None => {
                tracing::info!("SERPAPI_API_KEY not set, using Wikidata entity search");
                Arc::new(
                    WikidataSearch::new(&config.wikidata)
                        .context("Failed to create Wikidata search client")?,
                )
            }
        };

        let client = WikidataClient::new(&config.wikidata)
            .context("Failed to create Wikidata client")?
            .with_concurrency(options.concurrency);

        Ok(Self::new(search, Arc::new(client), options))
    }

    /// 사용 중인 검색 엔진 이름
    pub fn search_name(&self) -> &str {
        self.search.name()
    }
}

#[async_trait]
impl StatementSource for StatementFetcher {
    async fn statements_for_query(&self, question: &str, lang: &str) -> Result<Vec<Statement>> {
        let ids = self
            .search
            .search_entities(question, lang, self.options.max_entities)
            .await
            .with_context(|| format!("Entity search failed ({})", self.search.name()))?;

        if ids.is_empty() {
            tracing::warn!("No Wikidata entities found for: {}", question);
            return Ok(Vec::new());
        }
        tracing::info!("Fetching {} entities: {:?}", ids.len(), ids);

        let entities = &self.entities;
        let per_entity: Vec<(String, Result<Vec<Statement>>)> = stream::iter(ids)
            .map(|id| async move {
                let result = entities.entity_statements(&id, lang).await;
                (id, result)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut statements = Vec::new();
        for (id, result) in per_entity {
            match result {
                Ok(s) => statements.extend(s),
                Err(e) => tracing::warn!("Skipping entity {}: {:#}", id, e),
            }
        }

        tracing::info!("Collected {} statements", statements.len());
        Ok(statements)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedSearch(Vec<&'static str>);

    #[async_trait]
    impl EntitySearch for FixedSearch {
        async fn search_entities(
            &self,
            _question: &str,
            _lang: &str,
            limit: usize,
        ) -> Result<Vec<String>> {
            Ok(self.0.iter().take(limit).map(|s| s.to_string()).collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl EntitySearch for FailingSearch {
        async fn search_entities(&self, _: &str, _: &str, _: usize) -> Result<Vec<String>> {
            anyhow::bail!("quota exceeded")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Q-ID마다 문장 두 개, "Q0"은 실패. 앞 엔티티일수록 늦게 응답.
    struct FakeEntities {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntitySource for FakeEntities {
        async fn entity_statements(&self, id: &str, lang: &str) -> Result<Vec<Statement>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if id == "Q0" {
                anyhow::bail!("404 Not Found");
            }
            let n: u64 = id[1..].parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(20u64.saturating_sub(n * 5))).await;
            Ok((0..2)
                .map(|i| Statement {
                    statement: format!("{} fact {} ({})", id, i, lang),
                    qid: id.to_string(),
                    pid: format!("P{}", i + 1),
                    value: i.to_string(),
                })
                .collect())
        }
    }

    fn fetcher(search: Arc<dyn EntitySearch>, max_entities: usize) -> (StatementFetcher, Arc<FakeEntities>) {
        let entities = Arc::new(FakeEntities {
            calls: AtomicUsize::new(0),
        });
        let fetcher = StatementFetcher::new(
            search,
            entities.clone(),
            FetchOptions {
                concurrency: 4,
                max_entities,
            },
        );
        (fetcher, entities)
    }

    #[tokio::test]
    async fn test_statements_keep_search_order() {
        let (fetcher, _) = fetcher(Arc::new(FixedSearch(vec!["Q1", "Q2", "Q3"])), 10);
        let statements = fetcher.statements_for_query("q", "en").await.unwrap();

        let qids: Vec<&str> = statements.iter().map(|s| s.qid.as_str()).collect();
        assert_eq!(qids, vec!["Q1", "Q1", "Q2", "Q2", "Q3", "Q3"]);
        assert_eq!(statements[0].statement, "Q1 fact 0 (en)");
    }

    #[tokio::test]
    async fn test_failed_entity_is_skipped() {
        let (fetcher, entities) = fetcher(Arc::new(FixedSearch(vec!["Q1", "Q0", "Q2"])), 10);
        let statements = fetcher.statements_for_query("q", "de").await.unwrap();

        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| s.qid != "Q0"));
        assert_eq!(entities.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_entities_limits_fetches() {
        let (fetcher, entities) = fetcher(Arc::new(FixedSearch(vec!["Q1", "Q2", "Q3"])), 2);
        let statements = fetcher.statements_for_query("q", "en").await.unwrap();

        assert_eq!(statements.len(), 4);
        assert_eq!(entities.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_entities_is_empty() {
        let (fetcher, entities) = fetcher(Arc::new(FixedSearch(vec![])), 10);
        let statements = fetcher.statements_for_query("q", "en").await.unwrap();

        assert!(statements.is_empty());
        assert_eq!(entities.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let (fetcher, _) = fetcher(Arc::new(FailingSearch), 10);
        let err = fetcher.statements_for_query("q", "en").await.unwrap_err();
        assert!(format!("{:#}", err).contains("quota exceeded"));
    }

    #[test]
    fn test_from_config_picks_search_engine() {
        let config = Config::from_lookup(|_| None);
        let fetcher = StatementFetcher::from_config(&config, FetchOptions::default()).unwrap();
        assert_eq!(fetcher.search_name(), "wikidata");

        let config = Config::from_lookup(|k| (k == "SERPAPI_API_KEY").then(|| "key".to_string()));
        let fetcher = StatementFetcher::from_config(&config, FetchOptions::default()).unwrap();
        assert_eq!(fetcher.search_name(), "serpapi");
    }
}
