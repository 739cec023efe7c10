//! Headless front end for the ledger panel.
//!
//! Runs the same operations as the web UI against the configured repository,
//! which is handy from a terminal or a cron job.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use panel::core::message::AuthorIdentity;
use panel::exit_codes;
use panel::io::config::{PanelConfig, load_config};
use panel::sync::{PublishOutcome, PublishRequest};
use panel::{Panel, logging};

#[derive(Parser)]
#[command(
    name = "panel",
    version,
    about = "Drive a plain-text accounting repository: git, pull requests, queries, statements"
)]
struct Cli {
    /// Accounting repository working tree.
    #[arg(long, env = "GIT_REPO_PATH")]
    repo_path: Option<PathBuf>,

    /// Optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an allowed git subcommand (e.g. `panel run -- log --oneline`).
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        tokens: Vec<String>,
    },
    /// Commit the ledger file on the working branch and open (or reuse) a PR.
    Publish {
        /// Commit message.
        #[arg(short, long)]
        message: Option<String>,
        /// Record this e-mail address as the commit author.
        #[arg(long)]
        author_email: Option<String>,
    },
    /// Run a bean-query query against the ledger file.
    Query { query: String },
    /// Download the statement for one date (YYYY-MM-DD).
    FetchReport { date: String },
    /// Download statements from the newest stored report up to today.
    FetchLatest,
    /// Print the newest stored report date.
    LatestReportDate,
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(exit_codes::INVALID as u8)
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let panel = Panel::with_process_runner(resolve_config(&cli)?);

    let output = match cli.command {
        Command::Run { tokens } => panel.run_git(&tokens)?,
        Command::Publish {
            message,
            author_email,
        } => {
            let author = author_email
                .as_deref()
                .map(AuthorIdentity::from_email)
                .transpose()?;
            let outcome = panel.publish(&PublishRequest { message, author })?;
            println!("{outcome}");
            return Ok(match outcome {
                PublishOutcome::NoChanges => exit_codes::NO_CHANGES,
                PublishOutcome::Published { .. } => exit_codes::OK,
            });
        }
        Command::Query { query } => panel.query(&query)?,
        Command::FetchReport { date } => panel.fetch_report(&date)?,
        Command::FetchLatest => panel.fetch_latest_reports(chrono::Local::now().date_naive())?,
        Command::LatestReportDate => format!("{}\n", panel.last_report_date()?),
    };
    print!("{output}");
    Ok(exit_codes::OK)
}

fn resolve_config(cli: &Cli) -> Result<PanelConfig> {
    let mut cfg = match &cli.config {
        Some(path) => load_config(path)?,
        None => PanelConfig::default(),
    };
    if let Some(repo_path) = &cli.repo_path {
        cfg.repo_path = repo_path.clone();
    }
    cfg.resolve().context("resolve panel config")
}
