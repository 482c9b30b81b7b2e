//! `docpatch status` — session state at a glance.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use docpatch_sync::{Session, SessionState, Status};

use super::load_engine;

/// Arguments for `docpatch status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson {
    state: &'static str,
    staging_dir: String,
    session: Option<SessionJson>,
    missing: Vec<String>,
    dump_modified: Option<bool>,
}

#[derive(Serialize)]
struct SessionJson {
    target: String,
    namespace: String,
    created_at: String,
    documents: usize,
    skipped: usize,
    dump_file: String,
    dump_mode: String,
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let engine = load_engine()?;
        let status = engine.status().context("could not read session state")?;
        let staging_dir = engine.config().staging_dir.display().to_string();

        if self.json {
            let payload = to_json(&status, staging_dir);
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&status, &staging_dir);
        Ok(())
    }
}

fn session_json(session: &Session) -> SessionJson {
    SessionJson {
        target: session.query.target.clone(),
        namespace: format!("{}.{}", session.query.database, session.query.collection),
        created_at: session.created_at.to_rfc3339(),
        documents: session.documents,
        skipped: session.skipped,
        dump_file: session.dump_file.clone(),
        dump_mode: session.dump_mode.to_string(),
    }
}

fn to_json(status: &Status, staging_dir: String) -> StatusJson {
    let missing = match &status.state {
        SessionState::Lost { missing, .. } => {
            missing.iter().map(|p| p.display().to_string()).collect()
        }
        _ => Vec::new(),
    };
    StatusJson {
        state: status.state.label(),
        staging_dir,
        session: status.state.session().map(session_json),
        missing,
        dump_modified: status.dump_modified,
    }
}

fn state_indicator(state: &SessionState) -> String {
    match state {
        SessionState::Absent => "■ ABSENT".bright_black().bold().to_string(),
        SessionState::Active(_) => "■ ACTIVE".green().bold().to_string(),
        SessionState::Lost { .. } => "■ LOST".red().bold().to_string(),
    }
}

fn print_table(status: &Status, staging_dir: &str) {
    println!("docpatch v{} | {}", env!("CARGO_PKG_VERSION"), state_indicator(&status.state));

    let Some(session) = status.state.session() else {
        println!("No session in {staging_dir}. Run `docpatch query` to start one.");
        return;
    };

    let info = session_json(session);
    let mut rows = vec![
        Row { field: "target", value: info.target },
        Row { field: "namespace", value: info.namespace },
        Row { field: "created", value: info.created_at },
        Row { field: "documents", value: info.documents.to_string() },
        Row { field: "dump", value: format!("{} ({})", info.dump_file, info.dump_mode) },
    ];
    if info.skipped > 0 {
        rows.push(Row { field: "skipped", value: info.skipped.to_string() });
    }
    if let Some(modified) = status.dump_modified {
        let value = if modified { "yes".yellow().to_string() } else { "no".to_string() };
        rows.push(Row { field: "edited", value });
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if let SessionState::Lost { missing, .. } = &status.state {
        for path in missing {
            println!("  {} missing: {}", "✗".red().bold(), path.display());
        }
        println!("Run `docpatch recover` to rebuild the session, or `docpatch clear`.");
    }
}
