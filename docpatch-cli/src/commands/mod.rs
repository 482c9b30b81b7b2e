pub mod apply;
pub mod clear;
pub mod edit;
pub mod query;
pub mod recover;
pub mod review;
pub mod status;

use anyhow::{Context, Result};
use colored::Colorize;

use docpatch_core::{config, Change, ChangeCounts, ChangeKind};
use docpatch_sync::{Engine, LocalStore, Session};

/// Engine configured for the current working directory.
pub fn load_engine() -> Result<Engine> {
    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let config = config::load(&cwd).context("failed to load configuration")?;
    Engine::new(config).context("invalid configuration")
}

/// Open the store a session was queried from.
pub fn open_store(session: &Session) -> Result<LocalStore> {
    LocalStore::open(&session.query.target)
        .with_context(|| format!("cannot open store '{}'", session.query.target))
}

/// One-line summary such as `1 added, 2 updated, 0 deleted, 5 unchanged`.
pub fn counts_line(counts: &ChangeCounts) -> String {
    format!(
        "{} added, {} updated, {} deleted, {} unchanged",
        counts.added.to_string().green(),
        counts.updated.to_string().yellow(),
        counts.deleted.to_string().red(),
        counts.unchanged,
    )
}

/// `+`, `~`, `-` or `·`, coloured by kind.
pub fn kind_marker(kind: ChangeKind) -> String {
    match kind {
        ChangeKind::Added => "+".green().bold().to_string(),
        ChangeKind::Updated => "~".yellow().bold().to_string(),
        ChangeKind::Deleted => "-".red().bold().to_string(),
        ChangeKind::Noop => "·".bright_black().to_string(),
    }
}

pub fn print_changes(changes: &[Change]) {
    for change in changes.iter().filter(|c| !c.is_noop()) {
        println!("  {}  {}", kind_marker(change.kind()), change.identity());
    }
}
