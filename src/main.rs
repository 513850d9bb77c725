//! wikidata-rag CLI 진입점

use anyhow::Result;
use clap::Parser;

use wikidata_rag::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화 (RUST_LOG 우선, --verbose면 이 크레이트만 DEBUG)
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(cli::log_filter(cli.verbose, rust_log.as_deref())?)
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(cli::run(cli))
}
