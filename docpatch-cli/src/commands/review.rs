//! `docpatch review` — summarise pending changes without touching the store.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use docpatch_core::{ChangeCounts, ChangeKind};

use super::{kind_marker, load_engine, print_changes};

/// Arguments for `docpatch review`.
#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Also print the shell statements that would realise the changes.
    #[arg(long)]
    pub emit: bool,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "action")]
    action: &'static str,
    #[tabled(rename = "documents")]
    documents: usize,
}

impl ReviewArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;
        let review = engine.review(self.emit).context("review failed")?;

        println!("{}", counts_table(&review.counts));
        if review.counts.actionable() == 0 {
            println!("No changes.");
            return Ok(());
        }
        print_changes(&review.changes);

        if self.emit {
            println!();
            for statement in &review.statements {
                println!("{statement}");
            }
        }
        Ok(())
    }
}

fn counts_table(counts: &ChangeCounts) -> String {
    let rows: Vec<CountRow> = [
        (ChangeKind::Added, "added", counts.added),
        (ChangeKind::Updated, "updated", counts.updated),
        (ChangeKind::Deleted, "deleted", counts.deleted),
        (ChangeKind::Noop, "unchanged", counts.unchanged),
    ]
    .into_iter()
    .map(|(kind, action, documents)| CountRow {
        marker: kind_marker(kind),
        action,
        documents,
    })
    .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}
