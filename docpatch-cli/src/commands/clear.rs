//! `docpatch clear` — drop the session and its files.

use anyhow::{Context, Result};
use clap::Args;

use super::load_engine;

/// Arguments for `docpatch clear`.
#[derive(Args, Debug)]
pub struct ClearArgs {}

impl ClearArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;
        if engine.clear().context("could not clear session")? {
            println!("✓ session cleared");
        } else {
            println!("Nothing to clear.");
        }
        Ok(())
    }
}
