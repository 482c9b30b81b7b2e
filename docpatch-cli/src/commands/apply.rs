//! `docpatch apply` — write pending changes to the store, or print them as
//! shell statements with `--emit`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use super::{kind_marker, load_engine, open_store};

/// Arguments for `docpatch apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Print statements instead of writing to the store.
    #[arg(long)]
    pub emit: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;

        if self.emit {
            for statement in engine.emit().context("could not build statements")? {
                println!("{statement}");
            }
            return Ok(());
        }

        let session = engine.sessions().require_active()?;
        let mut store = open_store(&session)?;
        let report = engine.apply(&mut store).context("apply failed")?;

        if report.outcomes.is_empty() && report.aborted.is_none() {
            println!("Nothing to apply.");
            return Ok(());
        }

        for outcome in &report.outcomes {
            match &outcome.error {
                None => println!("  {}  {}", kind_marker(outcome.kind), outcome.identity),
                Some(e) => println!("  {}  {}: {e}", "✗".red().bold(), outcome.identity),
            }
        }

        let applied = report.succeeded().count();
        let failed = report.failed().count();
        println!("✓ {applied} applied, {failed} failed");

        if let Some(aborted) = &report.aborted {
            bail!(
                "stopped at {} {}: {}; {} change(s) not attempted, re-run apply once the store is reachable",
                aborted.kind,
                aborted.identity,
                aborted.error,
                report.not_attempted
            );
        }
        if failed > 0 {
            bail!("{failed} change(s) could not be applied; run `docpatch review` to inspect them");
        }
        Ok(())
    }
}
