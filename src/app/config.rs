use crate::app::cli::Cli;
use crate::app::dumper::DumpOptions;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_url: String,
    pub db_name: String,
    pub schema: String,
    pub output: Option<PathBuf>,
    pub ignore_tables: Vec<String>,
    pub skip_failed: bool,
}

impl AppConfig {
    pub fn dump_options(&self) -> DumpOptions {
        DumpOptions {
            ignore_tables: self.ignore_tables.clone(),
            skip_failed: self.skip_failed,
        }
    }
}

pub fn resolve_config(cli: Cli) -> Result<AppConfig> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let db_url = cli
        .db_url
        .or_else(|| env::var("DB_URL").ok())
        .context("DB_URL must be set via --db-url or in .env/environment variables")?;

    let schema = cli
        .schema
        .or_else(|| env::var("DB_SCHEMA").ok())
        .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

    Ok(AppConfig {
        db_name: database_name(&db_url),
        db_url,
        schema,
        output: cli.output,
        ignore_tables: cli.ignore.unwrap_or_default(),
        skip_failed: cli.skip_failed,
    })
}

fn database_name(db_url: &str) -> String {
    db_url
        .split('?')
        .next()
        .and_then(|base| base.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}
