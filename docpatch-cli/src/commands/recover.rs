//! `docpatch recover` — re-run the session's query to rebuild lost files.

use anyhow::{Context, Result};
use clap::Args;

use super::{load_engine, open_store};

/// Arguments for `docpatch recover`.
#[derive(Args, Debug)]
pub struct RecoverArgs {}

impl RecoverArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;
        let session = engine
            .sessions()
            .load()?
            .context("no session to recover; run `docpatch query` first")?;
        let store = open_store(&session)?;

        let outcome = engine.recover(&store).context("recovery failed")?;
        let dump = if outcome.kept_dump { "kept" } else { "rewritten" };
        println!(
            "✓ session recovered: {} document(s), dump {dump} at {}",
            outcome.session.documents,
            outcome.dump_path.display()
        );
        Ok(())
    }
}
