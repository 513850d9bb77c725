//! CLI 모듈
//!
//! wikidata-rag CLI 명령어 정의 및 구현

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, EmbeddingBackend, LlmBackend};
use crate::knowledge::{Document, SimilarityFunction};
use crate::pipeline::{QueryOptions, RagPipeline};
use crate::prompt::Language;
use crate::textification::{FetchOptions, StatementFetcher, StatementSource};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "wikidata-rag")]
#[command(version, about = "Wikidata 기반 RAG 질의응답", long_about = None)]
pub struct Cli {
    /// 디버그 로그 출력 (검색 결과, 프롬프트, 모델 응답)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 질문에 답변 (벡터 스토어 → Wikidata 폴백)
    Ask {
        /// 질문
        question: String,

        /// 질문 언어 (en, de)
        #[arg(short, long, default_value = "de")]
        lang: String,

        /// 검색할 문서 수
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// 폴백 검색 유사도 함수 (cosine, dot_product)
        #[arg(short, long, default_value = "cosine")]
        similarity: SimilarityFunction,

        /// Astra DB를 건너뛰고 항상 Wikidata에서 검색
        #[arg(long)]
        no_vector_store: bool,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 질문에 대해 수집된 Wikidata 문장 출력
    Statements {
        /// 질문
        question: String,

        /// 라벨 언어
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// 사용할 최대 엔티티 수
        #[arg(short, long, default_value = "10")]
        max_entities: usize,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 설정 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();

    match cli.command {
        Commands::Ask {
            question,
            lang,
            top_k,
            similarity,
            no_vector_store,
            json,
        } => {
            let options = QueryOptions {
                top_k,
                lang,
                similarity,
                ..Default::default()
            };
            cmd_ask(&config, &question, options, !no_vector_store, json).await
        }
        Commands::Statements {
            question,
            lang,
            max_entities,
            json,
        } => cmd_statements(&config, &question, &lang, max_entities, json).await,
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 질의응답 명령어 (ask)
async fn cmd_ask(
    config: &Config,
    question: &str,
    options: QueryOptions,
    use_vector_store: bool,
    json: bool,
) -> Result<()> {
    // 네트워크 클라이언트 생성 전에 언어 확인
    options.lang.parse::<Language>()?;

    let pipeline = RagPipeline::from_config(config, use_vector_store, FetchOptions::default())
        .context("파이프라인 초기화 실패")?;

    if !json {
        println!("[*] 질문: \"{}\"", question);
    }

    let answer = pipeline
        .process_query(question, &options)
        .await
        .context("질의 처리 실패")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("\n[OK] 답변:\n");
    println!("{}", answer.data);

    if answer.documents.is_empty() {
        println!("\n[!] 근거 문서가 없습니다.");
        return Ok(());
    }

    println!("\n근거 문서 ({} 건):\n", answer.documents.len());
    for (i, doc) in answer.documents.iter().enumerate() {
        println!("{}", format_document(i + 1, doc));
    }

    Ok(())
}

/// 문장 수집 명령어 (statements)
async fn cmd_statements(
    config: &Config,
    question: &str,
    lang: &str,
    max_entities: usize,
    json: bool,
) -> Result<()> {
    let fetcher = StatementFetcher::from_config(
        config,
        FetchOptions {
            max_entities,
            ..Default::default()
        },
    )?;

    if !json {
        println!("[*] 검색 중 ({}): \"{}\"", fetcher.search_name(), question);
    }

    let statements = fetcher
        .statements_for_query(question, lang)
        .await
        .context("Wikidata 문장 수집 실패")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
        return Ok(());
    }

    if statements.is_empty() {
        println!("\n[!] 수집된 문장이 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 수집된 문장 ({} 건):\n", statements.len());
    for statement in &statements {
        println!(
            "  [{}/{}] {}",
            statement.qid,
            statement.pid,
            truncate_text(&statement.statement, 160)
        );
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &Config) -> Result<()> {
    println!("wikidata-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // 1차 검색
    match &config.astra {
        Some(astra) => println!(
            "[OK] Astra DB: {} ({}.{})",
            astra.api_endpoint, astra.keyspace, astra.collection
        ),
        None => {
            println!("[!] Astra DB: 미설정 (Wikidata 폴백만 사용)");
            println!("    설정: export ASTRA_DB_API_ENDPOINT=... ASTRA_DB_APPLICATION_TOKEN=...");
        }
    }

    // 엔티티 검색
    if config.serpapi_api_key.is_some() {
        println!("[OK] 엔티티 검색: SerpAPI (site:{})", config.wikidata.wikidata_base);
    } else {
        println!("[*] 엔티티 검색: Wikidata wbsearchentities (SERPAPI_API_KEY 미설정)");
    }
    println!(
        "[*] Wikidata API: {} (timeout {}s)",
        config.wikidata.api_url,
        config.wikidata.timeout.as_secs()
    );

    // 임베딩
    let embedding_backend = match config.embedding.backend {
        EmbeddingBackend::HuggingFace => "huggingface",
        EmbeddingBackend::Gemini => "gemini",
    };
    match config.embedding.require_api_key() {
        Ok(_) => println!(
            "[OK] 임베딩: {} ({})",
            config.embedding.model, embedding_backend
        ),
        Err(e) => println!("[!] 임베딩: {} ({}) - {}", config.embedding.model, embedding_backend, e),
    }

    // 언어 모델
    let llm_backend = match config.llm.backend {
        LlmBackend::HuggingFace => "huggingface",
        LlmBackend::OpenAi => "openai",
        LlmBackend::Gemini => "gemini",
    };
    let key_state = if config.llm.api_key.is_some() {
        "API 키 설정됨"
    } else {
        "API 키 미설정"
    };
    println!(
        "[*] 언어 모델: {} ({}, {}) - {}",
        config.llm.model, llm_backend, config.llm.base_url, key_state
    );

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 로그 필터
///
/// `RUST_LOG`가 있으면 그대로 쓰고 없으면 INFO입니다.
/// `--verbose`는 이 크레이트만 DEBUG로 올립니다 (HTTP 라이브러리 로그는 그대로).
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    let filter = match rust_log.filter(|v| !v.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).context("Invalid RUST_LOG")?,
        None => EnvFilter::new("info"),
    };

    if verbose {
        Ok(filter.add_directive("wikidata_rag=debug".parse()?))
    } else {
        Ok(filter)
    }
}

/// 근거 문서 한 건 포맷팅
fn format_document(rank: usize, doc: &Document) -> String {
    let qid = doc.meta_str("qid").unwrap_or("-");
    let score = doc
        .score
        .map(|s| format!("{:.4}", s))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}. [{}] [점수: {}] {}",
        rank,
        qid,
        score,
        truncate_text(&doc.content, 200)
    )
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_text("Mileva Marić", 11), "Mileva Mari...");
    }

    #[test]
    fn test_format_document() {
        let mut meta = Map::new();
        meta.insert("qid".to_string(), json!("Q937"));
        let doc = Document::new("Albert Einstein spouse Mileva Marić", meta).with_score(0.87654);

        assert_eq!(
            format_document(1, &doc),
            "1. [Q937] [점수: 0.8765] Albert Einstein spouse Mileva Marić"
        );

        let bare = Document::new("no meta", Map::new());
        assert_eq!(format_document(2, &bare), "2. [-] [점수: -] no meta");
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from([
            "wikidata-rag",
            "ask",
            "Who is Einstein?",
            "--lang",
            "en",
            "-k",
            "3",
            "--similarity",
            "dot_product",
            "--no-vector-store",
        ]);
        assert!(!cli.verbose);
        match cli.command {
            Commands::Ask {
                question,
                lang,
                top_k,
                similarity,
                no_vector_store,
                json,
            } => {
                assert_eq!(question, "Who is Einstein?");
                assert_eq!(lang, "en");
                assert_eq!(top_k, 3);
                assert_eq!(similarity, SimilarityFunction::DotProduct);
                assert!(no_vector_store);
                assert!(!json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_defaults_and_verbose() {
        let cli = Cli::parse_from(["wikidata-rag", "ask", "Wer ist Einstein?", "--verbose"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Ask {
                lang,
                top_k,
                similarity,
                ..
            } => {
                assert_eq!(lang, "de");
                assert_eq!(top_k, 10);
                assert_eq!(similarity, SimilarityFunction::Cosine);
            }
            _ => panic!("expected ask"),
        }

        let cli = Cli::parse_from(["wikidata-rag", "statements", "Einstein", "-m", "2"]);
        assert!(matches!(
            cli.command,
            Commands::Statements { max_entities: 2, .. }
        ));
    }

    #[test]
    fn test_log_filter() {
        let filter = log_filter(false, None).unwrap().to_string();
        assert!(filter.contains("info"));
        assert!(!filter.contains("wikidata_rag"));

        let filter = log_filter(false, Some("warn")).unwrap().to_string();
        assert!(filter.contains("warn"));
        assert!(!filter.contains("info"));

        let filter = log_filter(true, Some("warn")).unwrap().to_string();
        assert!(filter.contains("warn"));
        assert!(filter.contains("wikidata_rag=debug"));
        assert!(!filter.contains("reqwest"));
    }

    #[tokio::test]
    async fn test_ask_rejects_unsupported_language() {
        let config = Config::from_lookup(|_| None);
        let options = QueryOptions {
            lang: "fr".to_string(),
            ..Default::default()
        };
        let err = cmd_ask(&config, "Qui est Einstein?", options, true, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("fr"));
    }
}
