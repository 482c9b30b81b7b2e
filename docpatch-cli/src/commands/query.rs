//! `docpatch query` — fetch documents and open a session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docpatch_codec::from_json_str;
use docpatch_core::{Document, QueryParams, SortKey};
use docpatch_sync::LocalStore;

use super::load_engine;

/// Arguments for `docpatch query`.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Store root directory.
    #[arg(long)]
    pub target: PathBuf,

    /// Database name.
    #[arg(long)]
    pub db: String,

    /// Collection name.
    #[arg(long)]
    pub collection: String,

    /// Equality filter as extended JSON, e.g. '{"status": "open"}'.
    #[arg(long)]
    pub filter: Option<String>,

    /// Comma-separated sort fields; prefix with '-' for descending.
    #[arg(long)]
    pub sort: Option<String>,

    /// Projection as JSON, e.g. '{"secret": 0}'.
    #[arg(long)]
    pub projection: Option<String>,

    /// Maximum number of documents (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    pub limit: u64,
}

impl QueryArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;

        // Sessions outlive the shell they were started from.
        let target = std::fs::canonicalize(&self.target)
            .with_context(|| format!("store directory '{}' not found", self.target.display()))?;
        let store = LocalStore::open(&target)?;

        let params = QueryParams {
            filter: parse_document("--filter", self.filter.as_deref())?,
            projection: parse_document("--projection", self.projection.as_deref())?,
            sort: self.sort.as_deref().map(SortKey::parse_list).unwrap_or_default(),
            limit: self.limit,
            ..QueryParams::new(target.display().to_string(), &self.db, &self.collection)
        };
        let namespace = params.namespace();

        let outcome = engine
            .query(&store, params)
            .with_context(|| format!("query on {namespace} failed"))?;

        println!(
            "✓ {} document(s) from {} → {}",
            outcome.session.documents,
            namespace,
            outcome.dump_path.display()
        );
        if !outcome.skipped.is_empty() {
            println!(
                "{} skipped {} unencodable result(s) at position(s) {:?}",
                "!".yellow().bold(),
                outcome.skipped.len(),
                outcome.skipped
            );
        }
        Ok(())
    }
}

fn parse_document(flag: &str, text: Option<&str>) -> Result<Document> {
    match text {
        None => Ok(Document::new()),
        Some(text) => from_json_str(text).with_context(|| format!("{flag} is not a JSON object")),
    }
}
