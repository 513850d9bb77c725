//! Wikidata 모듈 - REST API 클라이언트
//!
//! 엔티티를 가져와 참조된 아이템/프로퍼티 레이블을 해석하고
//! 자연어 문장 목록으로 변환합니다.
//!
//! source: https://www.wikidata.org/wiki/Wikidata:REST_API
//! ref: https://www.wikidata.org/w/rest.php/wikibase/v1/entities/items/Q42

mod cache;
mod statements;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::config::{default_concurrency, WikidataConfig};

pub use cache::{EntityKind, LabelCache};
pub use statements::{
    entity_to_statements, pick_label, referenced_entities, render_time, EntityData, References,
    Statement, StatementData,
};

/// REST API 경로 (MediaWiki 기본 경로 기준)
const REST_PATH: &str = "rest.php/wikibase/v1";

// ============================================================================
// EntitySource Trait
// ============================================================================

/// 엔티티 하나의 문장을 제공하는 소스
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// 엔티티 ID → 문장 목록
    async fn entity_statements(&self, id: &str, lang: &str) -> Result<Vec<Statement>>;
}

// ============================================================================
// WikidataClient
// ============================================================================

/// Wikidata REST API 클라이언트
pub struct WikidataClient {
    client: reqwest::Client,
    rest_base: String,
    cache: Arc<LabelCache>,
    concurrency: usize,
}

impl WikidataClient {
    /// 새 클라이언트 생성 (캐시는 새로 만듦)
    pub fn new(config: &WikidataConfig) -> Result<Self> {
        Self::with_cache(config, Arc::new(LabelCache::new()))
    }

    /// 기존 캐시를 공유하는 클라이언트 생성
    pub fn with_cache(config: &WikidataConfig, cache: Arc<LabelCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rest_base: format!("{}/{}", config.api_url.trim_end_matches('/'), REST_PATH),
            cache,
            concurrency: default_concurrency(),
        })
    }

    /// 레이블 해석 동시 요청 수
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn entity_url(&self, kind: EntityKind, id: &str) -> String {
        format!("{}/entities/{}/{}", self.rest_base, kind.path(), id)
    }

    /// 엔티티 전체 데이터 조회
    pub async fn get_entity(&self, id: &str) -> Result<EntityData> {
        let kind = EntityKind::of(id)
            .ok_or_else(|| anyhow::anyhow!("Not a Wikidata item or property id: {}", id))?;
        let url = self.entity_url(kind, id);
        tracing::debug!("GET {}", url);

        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request entity {}", id))?
            .error_for_status()
            .with_context(|| format!("Wikidata returned an error for {}", id))?
            .json::<EntityData>()
            .await
            .with_context(|| format!("Failed to parse entity {}", id))
    }

    /// 레이블 조회 (캐시 우선)
    ///
    /// 같은 레이블을 동시에 요청하면 한 번만 조회합니다.
    /// 조회 실패 시 ID를 그대로 반환하며 캐시에는 남기지 않습니다.
    pub async fn label(&self, id: &str, lang: &str) -> String {
        let Some(kind) = EntityKind::of(id) else {
            return id.to_string();
        };

        let resolved = self
            .cache
            .get_or_fetch(kind, id, lang, || async move {
                let labels = self.fetch_labels(kind, id).await?;
                Ok::<_, anyhow::Error>(pick_label(&labels, lang).unwrap_or(id).to_string())
            })
            .await;

        match resolved {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!("Label lookup failed for {}: {:#}", id, e);
                id.to_string()
            }
        }
    }

    async fn fetch_labels(&self, kind: EntityKind, id: &str) -> Result<HashMap<String, String>> {
        let url = format!("{}/labels", self.entity_url(kind, id));
        let labels = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<HashMap<String, String>>()
            .await?;
        Ok(labels)
    }

    /// 여러 ID의 레이블을 병렬로 해석
    pub async fn resolve_labels(&self, ids: &[String], lang: &str) -> HashMap<String, String> {
        stream::iter(ids.to_vec())
            .map(|id| async move {
                let label = self.label(&id, lang).await;
                (id, label)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// 받아 온 엔티티를 문장 목록으로 변환 (참조 레이블은 캐시 또는 API로 해석)
    pub async fn statements_from_entity(&self, entity: &EntityData, lang: &str) -> Vec<Statement> {
        // 주어 레이블은 응답에 이미 있으므로 캐시에 바로 적재
        let subject = (EntityKind::of(&entity.id), pick_label(&entity.labels, lang));
        if let (Some(kind), Some(label)) = subject {
            self.cache
                .insert(kind, &entity.id, lang, label.to_string())
                .await;
        }

        let refs = referenced_entities(entity);
        let ids: Vec<String> = refs.properties.into_iter().chain(refs.items).collect();
        let labels = self.resolve_labels(&ids, lang).await;

        entity_to_statements(entity, &labels, lang)
    }
}

#[async_trait]
impl EntitySource for WikidataClient {
    async fn entity_statements(&self, id: &str, lang: &str) -> Result<Vec<Statement>> {
        let entity = self.get_entity(id).await?;
        let statements = self.statements_from_entity(&entity, lang).await;
        tracing::debug!("{}: {} statements", id, statements.len());
        Ok(statements)
    }
}

// ============================================================================
// Tests
// ============================================================================
