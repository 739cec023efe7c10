//! GitHub CLI adapter for pull request lookup and creation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::PanelResult;
use crate::io::process::{CommandRunner, ToolCommand, run_tool_checked};

#[derive(Debug, Deserialize)]
struct PrSummary {
    url: String,
}

/// Wrapper for `gh pr` calls made from the repository directory.
#[derive(Clone)]
pub struct GhCli {
    program: String,
    workdir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl GhCli {
    pub fn new(
        program: impl Into<String>,
        workdir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
            runner,
        }
    }

    /// URL of an open PR whose head is `branch`, if any.
    #[instrument(skip_all, fields(branch))]
    pub fn open_pr_url(&self, branch: &str) -> PanelResult<Option<String>> {
        let cmd = self.command(&[
            "pr", "list", "--head", branch, "--state", "open", "--json", "url",
        ]);
        let output = run_tool_checked(self.runner.as_ref(), &cmd)?;
        let prs: Vec<PrSummary> = serde_json::from_str(output.stdout.trim())
            .with_context(|| format!("parse `{cmd}` output"))?;
        let url = prs.into_iter().next().map(|pr| pr.url);
        debug!(found = url.is_some(), "open PR lookup");
        Ok(url)
    }

    /// Create a PR for `branch` with title and body filled from its commits.
    ///
    /// Returns the PR URL (the last non-empty line `gh` prints).
    #[instrument(skip_all, fields(branch))]
    pub fn create_pr(&self, branch: &str) -> PanelResult<String> {
        let cmd = self.command(&["pr", "create", "--fill", "--head", branch]);
        let output = run_tool_checked(self.runner.as_ref(), &cmd)?;
        let url = output
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();
        info!(url = %url, "created pull request");
        Ok(url)
    }

    fn command(&self, args: &[&str]) -> ToolCommand {
        ToolCommand::new(&self.program, args.iter().copied(), &self.workdir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use crate::test_support::{ScriptedRunner, fail, ok};

    #[test]
    fn open_pr_url_reads_first_entry() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            ok("[{\"url\":\"https://github.com/o/r/pull/7\"}]\n"),
            ok("[]\n"),
        ]));
        let gh = GhCli::new("gh", "/repo", runner.clone());
        assert_eq!(
            gh.open_pr_url("edit").expect("lookup").as_deref(),
            Some("https://github.com/o/r/pull/7")
        );
        assert_eq!(gh.open_pr_url("edit").expect("lookup"), None);
        assert_eq!(
            runner.invocations()[0],
            "gh pr list --head edit --state open --json url"
        );
    }

    #[test]
    fn open_pr_url_rejects_garbage() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok("not json")]));
        let gh = GhCli::new("gh", "/repo", runner);
        assert!(matches!(
            gh.open_pr_url("edit"),
            Err(PanelError::Internal(_))
        ));
    }

    #[test]
    fn create_pr_returns_last_line() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok(
            "\nCreating pull request for edit into main\n\nhttps://github.com/o/r/pull/8\n",
        )]));
        let gh = GhCli::new("gh", "/repo", runner);
        assert_eq!(
            gh.create_pr("edit").expect("create"),
            "https://github.com/o/r/pull/8"
        );
    }

    #[test]
    fn create_pr_failure_keeps_stderr() {
        let runner = Arc::new(ScriptedRunner::new(vec![fail(1, "gh: not logged in")]));
        let gh = GhCli::new("gh", "/repo", runner);
        let err = gh.create_pr("edit").expect_err("fails");
        assert!(err.to_string().contains("gh: not logged in"));
    }
}
