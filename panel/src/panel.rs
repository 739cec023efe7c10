//! The panel service: one configured repository, one set of tool adapters,
//! one working tree lock.
//!
//! Both front ends (HTTP and CLI) go through [`Panel`], so validation always
//! happens before any subprocess runs and working tree sequences never
//! overlap.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::core::command::GitOp;
use crate::core::report_date::ReportDate;
use crate::error::PanelResult;
use crate::io::bean_query::BeanQuery;
use crate::io::config::PanelConfig;
use crate::io::gh::GhCli;
use crate::io::git::Git;
use crate::io::process::{CommandRunner, ProcessRunner};
use crate::io::reports::{Downloader, ReportFile, last_report_date, list_reports};
use crate::io::worktree::WorktreeLock;
use crate::sync::{PublishOutcome, PublishRequest, synchronize_and_publish};

pub struct Panel {
    config: PanelConfig,
    git: Git,
    gh: GhCli,
    bean_query: BeanQuery,
    downloader: Downloader,
    worktree: WorktreeLock,
}

impl Panel {
    /// Build a panel around a resolved configuration.
    pub fn new(config: PanelConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let repo = config.repo_path.clone();
        Self {
            git: Git::new(&config.tools.git, &repo, runner.clone()),
            gh: GhCli::new(&config.tools.gh, &repo, runner.clone()),
            bean_query: BeanQuery::new(
                &config.tools.bean_query,
                &repo,
                &config.tracked_file,
                runner.clone(),
            ),
            downloader: Downloader::new(
                config.reports.downloader.clone(),
                config.downloader_dir(),
                runner,
            ),
            worktree: WorktreeLock::new(),
            config,
        }
    }

    /// Panel that spawns real processes bounded by the configured timeout.
    pub fn with_process_runner(config: PanelConfig) -> Self {
        let runner = ProcessRunner::new(config.command_timeout(), config.output_limit_bytes);
        Self::new(config, Arc::new(runner))
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Validate `tokens` as a git command and run it in the repository.
    pub fn run_git<S: AsRef<str>>(&self, tokens: &[S]) -> PanelResult<String> {
        let op = GitOp::from_tokens(tokens)?;
        let _worktree = self.worktree.acquire("git run");
        self.git.run_op(&op)
    }

    /// Unstaged changes in the working tree.
    pub fn diff(&self) -> PanelResult<String> {
        let _worktree = self.worktree.acquire("git diff");
        self.git.diff()
    }

    /// Commit the tracked file and return the (possibly reused) PR.
    #[instrument(skip_all)]
    pub fn publish(&self, request: &PublishRequest) -> PanelResult<PublishOutcome> {
        let worktree = self.worktree.acquire("publish");
        let outcome = synchronize_and_publish(&self.git, &self.gh, &self.config, request, &worktree)?;
        info!(outcome = %outcome, "publish finished");
        Ok(outcome)
    }

    pub fn query(&self, query: &str) -> PanelResult<String> {
        self.bean_query.run(query)
    }

    pub fn reports(&self) -> PanelResult<Vec<ReportFile>> {
        list_reports(&self.config.reports_dir())
    }

    pub fn last_report_date(&self) -> PanelResult<ReportDate> {
        last_report_date(
            &self.config.reports_dir(),
            ReportDate::from(self.config.reports.start_date),
        )
    }

    /// Download the report for a single `YYYY-MM-DD` date.
    pub fn fetch_report(&self, raw_date: &str) -> PanelResult<String> {
        let date = ReportDate::parse(raw_date)?;
        self.downloader.download(date, date)
    }

    /// Download everything from the newest stored report up to `today`.
    pub fn fetch_latest_reports(&self, today: NaiveDate) -> PanelResult<String> {
        let from = self.last_report_date()?;
        self.downloader.download(from, ReportDate::from(today))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::PanelError;
    use crate::test_support::{ScriptedRunner, ok};

    fn panel_in(repo: &std::path::Path, runner: &Arc<ScriptedRunner>) -> Panel {
        let cfg = PanelConfig {
            repo_path: repo.to_path_buf(),
            ..PanelConfig::default()
        };
        Panel::new(cfg, runner.clone())
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn fetch_latest_starts_from_newest_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        let reports = temp.path().join("hbl-swipe-statements").join("reports");
        fs::create_dir_all(reports.join("2025-03")).expect("mkdir");
        fs::write(reports.join("report-2025-02-28.pdf"), "").expect("write");
        fs::write(reports.join("2025-03").join("report-2025-03-15.no-data"), "").expect("write");
        let runner = Arc::new(ScriptedRunner::new(vec![ok("saved 6 reports\n")]));
        let panel = panel_in(temp.path(), &runner);

        let out = panel.fetch_latest_reports(day("2025-03-20")).expect("fetch");

        assert_eq!(out, "saved 6 reports\n");
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].to_string(), "go run download.go 2025-03-15 2025-03-20");
        assert_eq!(commands[0].workdir, temp.path().join("hbl-swipe-statements"));
    }

    #[test]
    fn fetch_latest_with_no_reports_starts_at_floor() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("hbl-swipe-statements").join("reports"))
            .expect("mkdir");
        let runner = Arc::new(ScriptedRunner::new(vec![ok("")]));
        let panel = panel_in(temp.path(), &runner);

        panel.fetch_latest_reports(day("2025-01-09")).expect("fetch");

        assert_eq!(
            runner.invocations(),
            vec!["go run download.go 2025-01-01 2025-01-09"]
        );
    }

    #[test]
    fn fetch_latest_without_report_dir_spawns_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let panel = panel_in(temp.path(), &runner);

        let err = panel
            .fetch_latest_reports(day("2025-03-20"))
            .expect_err("missing dir");

        assert!(matches!(err, PanelError::Internal(_)));
        assert!(runner.invocations().is_empty());
    }
}
