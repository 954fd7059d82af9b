use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Optional database connection string. If not provided, looks for DB_URL env var.
    #[arg(short, long)]
    pub db_url: Option<String>,

    /// Schema to dump. Falls back to DB_SCHEMA, then "public".
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Table or view to leave out of the dump. May be repeated.
    #[arg(short, long)]
    pub ignore: Option<Vec<String>>,

    /// Write the dump to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Replace tables and views that fail to dump with a comment instead of aborting.
    #[arg(long)]
    pub skip_failed: bool,
}
