//! Wikidata 엔티티 → 자연어 문장 변환
//!
//! 네트워크 없이 동작하는 순수 변환 로직입니다.
//! 참조된 엔티티의 레이블은 호출자가 미리 해석해서 넘겨줍니다.
//!
//! source: https://doc.wikimedia.org/Wikibase/master/js/rest-api/

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// REST API Types
// ============================================================================

/// 아이템/프로퍼티 공통 데이터 (`GET /entities/items/{id}`, `/entities/properties/{id}`)
#[derive(Debug, Clone, Deserialize)]
pub struct EntityData {
    pub id: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub statements: BTreeMap<String, Vec<StatementData>>,
}

/// 개별 statement
#[derive(Debug, Clone, Deserialize)]
pub struct StatementData {
    #[serde(default = "default_rank")]
    pub rank: String,
    pub property: PropertyRef,
    pub value: StatementValue,
}

fn default_rank() -> String {
    "normal".to_string()
}

/// statement가 가리키는 프로퍼티
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyRef {
    pub id: String,
    #[serde(default)]
    pub data_type: Option<String>,
}

/// statement 값 (`type`: value | somevalue | novalue)
#[derive(Debug, Clone, Deserialize)]
pub struct StatementValue {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<Value>,
}

// ============================================================================
// Output
// ============================================================================

/// 평탄화된 Wikidata 문장
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// "{주어} {프로퍼티} {값}"
    pub statement: String,
    /// 주어 엔티티 ID
    pub qid: String,
    /// 프로퍼티 ID
    pub pid: String,
    /// 렌더링된 값
    pub value: String,
}

/// 레이블 해석이 필요한 엔티티 ID
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct References {
    pub items: Vec<String>,
    pub properties: Vec<String>,
}

// ============================================================================
// Label Selection
// ============================================================================

/// 레이블 선택: 요청 언어 → mul → en → 아무 언어
pub fn pick_label<'a>(labels: &'a HashMap<String, String>, lang: &str) -> Option<&'a str> {
    [lang, "mul", "en"]
        .iter()
        .find_map(|l| labels.get(*l))
        .or_else(|| {
            // 결정적인 결과를 위해 언어 코드 순으로 첫 번째
            let mut langs: Vec<&String> = labels.keys().collect();
            langs.sort();
            langs.first().and_then(|l| labels.get(*l))
        })
        .map(String::as_str)
}

// ============================================================================
// Conversion
// ============================================================================

/// deprecated가 아닌 statement 순회
fn active_statements(entity: &EntityData) -> impl Iterator<Item = &StatementData> {
    entity
        .statements
        .values()
        .flatten()
        .filter(|s| s.rank != "deprecated")
}

/// 엔티티가 참조하는 아이템/프로퍼티 ID 수집 (중복 없음, 첫 등장 순)
pub fn referenced_entities(entity: &EntityData) -> References {
    let mut refs = References::default();
    let push = |list: &mut Vec<String>, id: &str| {
        if !list.iter().any(|x| x == id) {
            list.push(id.to_string());
        }
    };

    for statement in active_statements(entity) {
        push(&mut refs.properties, &statement.property.id);

        if statement.value.kind != "value" {
            continue;
        }
        let Some(content) = &statement.value.content else {
            continue;
        };

        match statement.property.data_type.as_deref() {
            Some("wikibase-item") => {
                if let Some(id) = content.as_str() {
                    push(&mut refs.items, id);
                }
            }
            Some("wikibase-property") => {
                if let Some(id) = content.as_str() {
                    push(&mut refs.properties, id);
                }
            }
            Some("quantity") => {
                if let Some(unit) = quantity_unit_id(content) {
                    push(&mut refs.items, unit);
                }
            }
            _ => {}
        }
    }

    refs
}

/// 엔티티를 문장 목록으로 변환
///
/// # Arguments
/// * `entity` - REST API에서 받은 엔티티
/// * `labels` - 참조 엔티티 ID → 레이블 (없으면 ID 그대로 사용)
/// * `lang` - 주어 레이블 언어
pub fn entity_to_statements(
    entity: &EntityData,
    labels: &HashMap<String, String>,
    lang: &str,
) -> Vec<Statement> {
    let subject = pick_label(&entity.labels, lang).unwrap_or(entity.id.as_str());
    let label_of = |id: &str| labels.get(id).cloned().unwrap_or_else(|| id.to_string());

    active_statements(entity)
        .filter_map(|statement| {
            let value = render_value(statement, &label_of)?;
            let property = label_of(&statement.property.id);
            Some(Statement {
                statement: format!("{} {} {}", subject, property, value),
                qid: entity.id.clone(),
                pid: statement.property.id.clone(),
                value,
            })
        })
        .collect()
}

/// 값 렌더링 (빈 값은 None)
fn render_value(statement: &StatementData, label_of: &dyn Fn(&str) -> String) -> Option<String> {
    match statement.value.kind.as_str() {
        "novalue" => return Some("no value".to_string()),
        "somevalue" => return Some("unknown value".to_string()),
        _ => {}
    }

    let content = statement.value.content.as_ref()?;

    let rendered = match statement.property.data_type.as_deref() {
        Some("wikibase-item") | Some("wikibase-property") => label_of(content.as_str()?),
        Some("time") => render_time(content)?,
        Some("quantity") => render_quantity(content, label_of)?,
        Some("monolingualtext") => content.get("text")?.as_str()?.to_string(),
        Some("globe-coordinate") => {
            let lat = content.get("latitude")?.as_f64()?;
            let lon = content.get("longitude")?.as_f64()?;
            format!("{}, {}", lat, lon)
        }
        _ => match content {
            Value::String(s) => s.clone(),
            Value::Null => return None,
            other => other.to_string(),
        },
    };

    let rendered = rendered.trim().to_string();
    (!rendered.is_empty()).then_some(rendered)
}

/// 시간 값 렌더링 (precision: 11=일, 10=월, 9=년, 그 이하는 연도만)
///
/// `+1879-03-14T00:00:00Z` → `1879-03-14`, 음수 연도는 ` BCE` 접미사.
pub fn render_time(content: &Value) -> Option<String> {
    let time = content.get("time")?.as_str()?;
    let precision = content.get("precision").and_then(Value::as_u64).unwrap_or(11);

    let (bce, rest) = match *time.as_bytes().first()? {
        b'-' => (true, &time[1..]),
        b'+' => (false, &time[1..]),
        _ => (false, time),
    };
    let date = rest.split('T').next()?;
    let mut parts = date.splitn(3, '-');
    let year_str = parts.next()?;
    let month_str = parts.next().unwrap_or("00");
    let day_str = parts.next().unwrap_or("00");

    // 지질학적 연도(-13798000000 등)는 i32 범위를 넘음
    let year: i64 = year_str.parse().ok()?;
    let month: u32 = month_str.parse().unwrap_or(0);
    let day: u32 = day_str.parse().unwrap_or(0);

    let rendered = if precision >= 11 && month > 0 && day > 0 {
        let date = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, day));
        match date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => format!("{}-{:02}-{:02}", year, month, day),
        }
    } else if precision >= 10 && month > 0 {
        format!("{}-{:02}", year, month)
    } else {
        year.to_string()
    };

    Some(if bce {
        format!("{} BCE", rendered)
    } else {
        rendered
    })
}

/// 수량 단위 엔티티 ID (`http://www.wikidata.org/entity/Q11573` → `Q11573`)
fn quantity_unit_id(content: &Value) -> Option<&str> {
    let unit = content.get("unit")?.as_str()?;
    if unit == "1" {
        return None;
    }
    unit.rsplit('/').next().filter(|id| !id.is_empty())
}

fn render_quantity(content: &Value, label_of: &dyn Fn(&str) -> String) -> Option<String> {
    let amount = content.get("amount")?.as_str()?;
    let amount = amount.strip_prefix('+').unwrap_or(amount);

    Some(match quantity_unit_id(content) {
        Some(unit) => format!("{} {}", amount, label_of(unit)),
        None => amount.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn einstein() -> EntityData {
        serde_json::from_value(json!({
            "type": "item",
            "id": "Q937",
            "labels": { "en": "Albert Einstein", "de": "Albert Einstein" },
            "descriptions": { "en": "German-born theoretical physicist" },
            "statements": {
                "P31": [{
                    "id": "Q937$1",
                    "rank": "normal",
                    "property": { "id": "P31", "data_type": "wikibase-item" },
                    "value": { "type": "value", "content": "Q5" }
                }],
                "P569": [{
                    "id": "Q937$2",
                    "rank": "preferred",
                    "property": { "id": "P569", "data_type": "time" },
                    "value": { "type": "value", "content": {
                        "time": "+1879-03-14T00:00:00Z",
                        "precision": 11,
                        "calendarmodel": "http://www.wikidata.org/entity/Q1985727"
                    } }
                }],
                "P2048": [{
                    "id": "Q937$3",
                    "rank": "normal",
                    "property": { "id": "P2048", "data_type": "quantity" },
                    "value": { "type": "value", "content": {
                        "amount": "+1.75",
                        "unit": "http://www.wikidata.org/entity/Q11573"
                    } }
                }],
                "P1559": [{
                    "id": "Q937$4",
                    "rank": "normal",
                    "property": { "id": "P1559", "data_type": "monolingualtext" },
                    "value": { "type": "value", "content": { "text": "Albert Einstein", "language": "de" } }
                }],
                "P26": [
                    {
                        "id": "Q937$5",
                        "rank": "normal",
                        "property": { "id": "P26", "data_type": "wikibase-item" },
                        "value": { "type": "value", "content": "Q76346" }
                    },
                    {
                        "id": "Q937$6",
                        "rank": "deprecated",
                        "property": { "id": "P26", "data_type": "wikibase-item" },
                        "value": { "type": "value", "content": "Q999" }
                    }
                ],
                "P214": [{
                    "id": "Q937$7",
                    "property": { "id": "P214", "data_type": "external-id" },
                    "value": { "type": "value", "content": "75121530" }
                }],
                "P570": [{
                    "id": "Q937$8",
                    "property": { "id": "P570", "data_type": "time" },
                    "value": { "type": "somevalue" }
                }]
            }
        }))
        .expect("valid entity json")
    }

    fn labels() -> HashMap<String, String> {
        [
            ("P31", "instance of"),
            ("Q5", "human"),
            ("P569", "date of birth"),
            ("P2048", "height"),
            ("Q11573", "metre"),
            ("P1559", "name in native language"),
            ("P26", "spouse"),
            ("Q76346", "Mileva Marić"),
            ("P214", "VIAF ID"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn find<'a>(statements: &'a [Statement], pid: &str) -> Vec<&'a Statement> {
        statements.iter().filter(|s| s.pid == pid).collect()
    }

    #[test]
    fn test_referenced_entities() {
        let refs = referenced_entities(&einstein());
        assert!(refs.items.contains(&"Q5".to_string()));
        assert!(refs.items.contains(&"Q76346".to_string()));
        assert!(refs.items.contains(&"Q11573".to_string()));
        // deprecated statement의 값은 해석하지 않음
        assert!(!refs.items.contains(&"Q999".to_string()));
        assert_eq!(refs.properties.len(), 7);
    }

    #[test]
    fn test_entity_to_statements() {
        let statements = entity_to_statements(&einstein(), &labels(), "en");

        let p31 = find(&statements, "P31");
        assert_eq!(p31.len(), 1);
        assert_eq!(p31[0].statement, "Albert Einstein instance of human");
        assert_eq!(p31[0].qid, "Q937");
        assert_eq!(p31[0].value, "human");

        assert_eq!(find(&statements, "P569")[0].value, "1879-03-14");
        assert_eq!(find(&statements, "P2048")[0].value, "1.75 metre");
        assert_eq!(find(&statements, "P1559")[0].value, "Albert Einstein");
        assert_eq!(find(&statements, "P214")[0].value, "75121530");
        assert_eq!(find(&statements, "P570")[0].value, "unknown value");

        // deprecated 제외
        let spouses = find(&statements, "P26");
        assert_eq!(spouses.len(), 1);
        assert_eq!(spouses[0].statement, "Albert Einstein spouse Mileva Marić");
    }

    #[test]
    fn test_unresolved_labels_fall_back_to_ids() {
        let statements = entity_to_statements(&einstein(), &HashMap::new(), "en");
        let p31 = find(&statements, "P31");
        assert_eq!(p31[0].statement, "Albert Einstein P31 Q5");
    }

    #[test]
    fn test_pick_label_fallback() {
        let mut labels = HashMap::new();
        labels.insert("fr".to_string(), "Einstein (fr)".to_string());
        labels.insert("en".to_string(), "Einstein".to_string());
        assert_eq!(pick_label(&labels, "de"), Some("Einstein"));
        assert_eq!(pick_label(&labels, "fr"), Some("Einstein (fr)"));

        labels.remove("en");
        labels.insert("mul".to_string(), "Einstein (mul)".to_string());
        assert_eq!(pick_label(&labels, "de"), Some("Einstein (mul)"));

        assert_eq!(pick_label(&HashMap::new(), "de"), None);
    }

    #[test]
    fn test_subject_without_label_uses_id() {
        let mut entity = einstein();
        entity.labels.clear();
        let statements = entity_to_statements(&entity, &labels(), "en");
        assert!(statements[0].statement.starts_with("Q937 "));
    }

    #[test]
    fn test_render_time_precisions() {
        let t = |time: &str, precision: u64| {
            render_time(&json!({ "time": time, "precision": precision }))
        };
        assert_eq!(t("+1879-03-14T00:00:00Z", 11).as_deref(), Some("1879-03-14"));
        assert_eq!(t("+1879-03-00T00:00:00Z", 10).as_deref(), Some("1879-03"));
        assert_eq!(t("+1879-00-00T00:00:00Z", 9).as_deref(), Some("1879"));
        assert_eq!(t("+1879-03-14T00:00:00Z", 7).as_deref(), Some("1879"));
        assert_eq!(t("-0044-03-15T00:00:00Z", 9).as_deref(), Some("44 BCE"));
        assert_eq!(t("+1879-00-00T00:00:00Z", 11).as_deref(), Some("1879"));
        assert!(render_time(&json!({ "precision": 11 })).is_none());
    }

    #[test]
    fn test_deep_time_year_is_kept() {
        assert_eq!(
            render_time(&json!({ "time": "-13798000000-00-00T00:00:00Z", "precision": 3 }))
                .as_deref(),
            Some("13798000000 BCE")
        );

        let universe: EntityData = serde_json::from_value(json!({
            "id": "Q1",
            "labels": { "en": "universe" },
            "statements": {
                "P580": [{
                    "property": { "id": "P580", "data_type": "time" },
                    "value": { "type": "value", "content": {
                        "time": "-13798000000-00-00T00:00:00Z",
                        "precision": 3
                    } }
                }]
            }
        }))
        .unwrap();
        let mut labels = HashMap::new();
        labels.insert("P580".to_string(), "start time".to_string());

        let statements = entity_to_statements(&universe, &labels, "en");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].statement, "universe start time 13798000000 BCE");
    }

    #[test]
    fn test_render_dimensionless_quantity() {
        let statement: StatementData = serde_json::from_value(json!({
            "property": { "id": "P1082", "data_type": "quantity" },
            "value": { "type": "value", "content": { "amount": "+3644826", "unit": "1" } }
        }))
        .unwrap();
        let label_of = |id: &str| id.to_string();
        assert_eq!(render_value(&statement, &label_of).as_deref(), Some("3644826"));
    }

    #[test]
    fn test_render_coordinates_and_novalue() {
        let coords: StatementData = serde_json::from_value(json!({
            "property": { "id": "P625", "data_type": "globe-coordinate" },
            "value": { "type": "value", "content": { "latitude": 52.5, "longitude": 13.4 } }
        }))
        .unwrap();
        let novalue: StatementData = serde_json::from_value(json!({
            "property": { "id": "P40", "data_type": "wikibase-item" },
            "value": { "type": "novalue" }
        }))
        .unwrap();
        let label_of = |id: &str| id.to_string();
        assert_eq!(render_value(&coords, &label_of).as_deref(), Some("52.5, 13.4"));
        assert_eq!(render_value(&novalue, &label_of).as_deref(), Some("no value"));
    }
}
