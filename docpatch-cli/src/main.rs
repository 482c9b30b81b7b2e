//! docpatch — edit database documents as text, then apply the difference.
//!
//! # Usage
//!
//! ```text
//! docpatch query --target <dir> --db <db> --collection <c> [--filter <json>] [--sort <fields>]
//!                [--projection <json>] [--limit N]
//! docpatch edit [--editor <cmd>]
//! docpatch review [--emit]
//! docpatch apply [--emit]
//! docpatch status [--json]
//! docpatch recover
//! docpatch clear
//! ```
//!
//! Staging files live in `.docpatch/` under the working directory unless
//! `docpatch.yaml` says otherwise.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    apply::ApplyArgs, clear::ClearArgs, edit::EditArgs, query::QueryArgs, recover::RecoverArgs,
    review::ReviewArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docpatch",
    version,
    about = "Snapshot documents into an editable file and apply your edits back",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch documents and open a new session.
    Query(QueryArgs),

    /// Open the session dump in $VISUAL or $EDITOR.
    Edit(EditArgs),

    /// Show what applying the edited dump would change.
    Review(ReviewArgs),

    /// Write the edited dump's changes to the store.
    Apply(ApplyArgs),

    /// Show the session state.
    Status(StatusArgs),

    /// Rebuild a lost session by re-running its query.
    Recover(RecoverArgs),

    /// Remove the session and its files.
    Clear(ClearArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Query(args) => args.run(),
        Commands::Edit(args) => args.run(),
        Commands::Review(args) => args.run(),
        Commands::Apply(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Recover(args) => args.run(),
        Commands::Clear(args) => args.run(),
    }
}

/// Library `log` records are bridged into the subscriber. Quiet by default;
/// `RUST_LOG=info` shows artifact writes and applied changes.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
