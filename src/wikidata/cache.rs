//! 레이블 캐시
//!
//! 아이템/프로퍼티 레이블을 `(id, lang)` 단위로 메모리에 보관합니다.
//! 여러 엔티티를 병렬로 수집할 때 같은 프로퍼티를 반복 조회하지 않도록
//! 모든 작업이 하나의 캐시를 공유합니다. 프로세스 종료 시 사라집니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{OnceCell, RwLock};

/// 엔티티 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item,
    Property,
}

impl EntityKind {
    /// ID 접두어로 종류 판별 (Q → Item, P → Property)
    pub fn of(id: &str) -> Option<Self> {
        match id.as_bytes().first() {
            Some(b'Q') => Some(Self::Item),
            Some(b'P') => Some(Self::Property),
            _ => None,
        }
    }

    /// REST API 경로 세그먼트
    pub fn path(&self) -> &'static str {
        match self {
            Self::Item => "items",
            Self::Property => "properties",
        }
    }
}

type Key = (String, String);

/// 키마다 한 번만 채워지는 슬롯 (동시 조회는 같은 요청을 기다림)
type Slot = Arc<OnceCell<String>>;

/// 레이블 캐시
#[derive(Debug, Default)]
pub struct LabelCache {
    items: RwLock<HashMap<Key, Slot>>,
    properties: RwLock<HashMap<Key, Slot>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: EntityKind) -> &RwLock<HashMap<Key, Slot>> {
        match kind {
            EntityKind::Item => &self.items,
            EntityKind::Property => &self.properties,
        }
    }

    async fn slot(&self, kind: EntityKind, id: &str, lang: &str) -> Slot {
        let key = (id.to_string(), lang.to_string());
        let existing = self.map(kind).read().await.get(&key).cloned();
        match existing {
            Some(slot) => slot,
            None => self.map(kind).write().await.entry(key).or_default().clone(),
        }
    }

    /// 캐시된 레이블 조회
    pub async fn get(&self, kind: EntityKind, id: &str, lang: &str) -> Option<String> {
        let key = (id.to_string(), lang.to_string());
        let slot = self.map(kind).read().await.get(&key).cloned()?;
        slot.get().cloned()
    }

    /// 레이블 저장 (이미 있으면 유지)
    pub async fn insert(&self, kind: EntityKind, id: &str, lang: &str, label: String) {
        let _ = self.slot(kind, id, lang).await.set(label);
    }

    /// 캐시된 레이블 또는 `fetch` 결과
    ///
    /// 같은 키에 대한 동시 호출은 하나의 `fetch`만 실행하고 그 결과를 공유합니다.
    /// 실패한 조회는 캐시에 남지 않으므로 다음 호출이 다시 시도합니다.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        kind: EntityKind,
        id: &str,
        lang: &str,
        fetch: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let slot = self.slot(kind, id, lang).await;
        slot.get_or_try_init(fetch).await.cloned()
    }
}
