pub mod cli;
pub mod config;
pub mod dumper;
pub mod error;
pub mod formatter;
pub mod inspector;
pub mod models;
pub mod provider;
pub mod quote;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use self::cli::Cli;
use self::config::{AppConfig, resolve_config};
use self::dumper::Dumper;
use self::inspector::Inspector;

// One connection: the dump issues one query at a time.
async fn connect(config: &AppConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.db_url)
        .await
        .context("Failed to connect to database")
}

// Connects, Inspects, and Dumps in one go.
pub async fn generate_dump(config: &AppConfig) -> Result<String> {
    let pool = connect(config).await?;

    let inspector = Inspector::new(&pool, &config.schema);
    let dump = Dumper::new(&inspector, config.dump_options())
        .dump_string()
        .await
        .with_context(|| format!("Failed to dump database {}", config.db_name));

    pool.close().await;
    dump
}

pub async fn run() -> Result<()> {
    // 1. Parse Args
    let args = Cli::parse();

    // 2. Resolve Config
    let config = resolve_config(args)?;
    info!(database = config.db_name.as_str(), schema = config.schema.as_str(), "Dumping");

    // 3. Connect
    let pool = connect(&config).await?;
    let inspector = Inspector::new(&pool, &config.schema);
    let dumper = Dumper::new(&inspector, config.dump_options());

    // 4. Dump and Output
    let written = match &config.output {
        Some(path) => dumper.write_dump_to(path).await,
        None => dumper.write_dump(tokio::io::stdout(), "stdout").await,
    };

    pool.close().await;
    written.with_context(|| format!("Failed to dump database {}", config.db_name))
}
