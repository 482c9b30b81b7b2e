//! `docpatch edit` — open the session dump in the user's editor.

use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::Args;

use super::{counts_line, load_engine};

/// Arguments for `docpatch edit`.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Editor command; defaults to $VISUAL, then $EDITOR.
    #[arg(long)]
    pub editor: Option<String>,
}

impl EditArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;
        let dump = engine.dump_path().context("no dump to edit")?;

        let editor = self
            .editor
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|e| !e.trim().is_empty())
            .context("no editor configured; set $VISUAL or $EDITOR, or pass --editor")?;

        // Editors are often configured with flags, e.g. "code --wait".
        let mut parts = editor.split_whitespace();
        let program = parts.next().context("editor command is empty")?;
        tracing::debug!("spawning {editor} on {}", dump.display());
        let status = Command::new(program)
            .args(parts)
            .arg(&dump)
            .status()
            .with_context(|| format!("failed to launch editor '{program}'"))?;
        if !status.success() {
            bail!("editor exited with {status}; the dump was left as is");
        }

        let review = engine.review(false).context("edited dump could not be read")?;
        println!("✓ {}", counts_line(&review.counts));
        Ok(())
    }
}
