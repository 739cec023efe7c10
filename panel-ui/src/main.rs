//! Panel UI server - local web page for driving the accounting repository.

mod error;
mod pages;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use panel::io::config::{PanelConfig, load_config};
use panel::{Panel, logging};
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "panel-ui")]
#[command(about = "Local web panel for a plain-text accounting repository")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "7001")]
    port: u16,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Accounting repository working tree
    #[arg(long, env = "GIT_REPO_PATH")]
    repo_path: Option<PathBuf>,

    /// Browser URL of the repository, linked from the page
    #[arg(long, env = "GIT_REPO_URL")]
    repo_url: Option<String>,
}

impl Args {
    fn panel_config(&self) -> anyhow::Result<PanelConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => PanelConfig::default(),
        };
        if let Some(repo_path) = &self.repo_path {
            cfg.repo_path = repo_path.clone();
        }
        if let Some(repo_url) = &self.repo_url {
            cfg.repo_url = repo_url.clone();
        }
        cfg.resolve().context("resolve panel config")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args = Args::parse();
    let cfg = args.panel_config()?;
    info!(
        repo = %cfg.repo_path.display(),
        branch = %cfg.working_branch,
        "starting panel-ui"
    );

    let app = routes::router(AppState::new(Panel::with_process_runner(cfg)));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
