//! Git adapter for panel operations.
//!
//! Every call goes through a [`CommandRunner`] so the orchestration can be
//! exercised against a scripted runner, and every non-zero exit is surfaced
//! with the captured output.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::core::command::GitOp;
use crate::error::PanelResult;
use crate::io::process::{
    CommandRunner, ToolCommand, ToolOutput, run_tool, run_tool_checked, tool_failure,
};

/// Wrapper for executing git commands in a working directory.
#[derive(Clone)]
pub struct Git {
    program: String,
    workdir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Git {
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

    /// Return the current branch name (`HEAD` when detached).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> PanelResult<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Create `branch` at the current HEAD (resetting it if it exists) and check it out.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_reset_branch(&self, branch: &str) -> PanelResult<()> {
        debug!(branch, "checking out branch at HEAD");
        self.run_checked(&["checkout", "-B", branch])?;
        Ok(())
    }

    pub fn fetch(&self, remote: &str) -> PanelResult<()> {
        self.run_checked(&["fetch", remote])?;
        Ok(())
    }

    /// True if `remote` has a head named `branch`.
    ///
    /// `ls-remote --exit-code` exits with 2 when nothing matches; any other
    /// non-zero exit is a real failure.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> PanelResult<bool> {
        let args = ["ls-remote", "--exit-code", "--heads", remote, branch];
        let cmd = self.command(&args);
        let output = run_tool(self.runner.as_ref(), &cmd)?;
        match output.code {
            Some(0) => Ok(true),
            Some(2) => {
                debug!(remote, branch, "remote branch absent");
                Ok(false)
            }
            _ => Err(tool_failure(&cmd, output)),
        }
    }

    /// Merge `rev` into the current branch without opening an editor.
    #[instrument(skip_all, fields(rev))]
    pub fn merge(&self, rev: &str) -> PanelResult<()> {
        debug!(rev, "merging");
        self.run_checked(&["merge", "--no-edit", rev])?;
        Ok(())
    }

    /// Abandon an in-progress merge and restore the pre-merge state.
    pub fn merge_abort(&self) -> PanelResult<()> {
        self.run_checked(&["merge", "--abort"])?;
        Ok(())
    }

    pub fn add(&self, path: &str) -> PanelResult<()> {
        self.run_checked(&["add", "--", path])?;
        Ok(())
    }

    /// True if the index differs from HEAD.
    pub fn has_staged_changes(&self) -> PanelResult<bool> {
        let cmd = self.command(&["diff", "--cached", "--quiet"]);
        let output = run_tool(self.runner.as_ref(), &cmd)?;
        match output.code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(tool_failure(&cmd, output)),
        }
    }

    /// Commit staged changes, optionally recording a different author.
    #[instrument(skip_all, fields(with_author = author.is_some()))]
    pub fn commit(&self, message: &str, author: Option<&str>) -> PanelResult<String> {
        let mut args = vec!["commit", "-m", message];
        if let Some(author) = author {
            args.push("--author");
            args.push(author);
        }
        self.run_capture(&args)
    }

    /// Push `branch` and set it as the upstream of the local branch.
    pub fn push_upstream(&self, remote: &str, branch: &str) -> PanelResult<()> {
        self.run_checked(&["push", "-u", remote, branch])?;
        Ok(())
    }

    /// Unstaged working tree diff.
    pub fn diff(&self) -> PanelResult<String> {
        self.run_capture(&["diff"])
    }

    /// Run a validated user operation and return its stdout.
    #[instrument(skip_all, fields(subcommand = %op.subcommand()))]
    pub fn run_op(&self, op: &GitOp) -> PanelResult<String> {
        let args = op.to_args();
        let cmd = ToolCommand::new(&self.program, args, &self.workdir);
        let output = run_tool_checked(self.runner.as_ref(), &cmd).inspect_err(|err| {
            warn!(err = %err, "git passthrough failed");
        })?;
        Ok(output.stdout)
    }

    fn run_capture(&self, args: &[&str]) -> PanelResult<String> {
        Ok(self.run_checked(args)?.stdout)
    }

    fn run_checked(&self, args: &[&str]) -> PanelResult<ToolOutput> {
        run_tool_checked(self.runner.as_ref(), &self.command(args))
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

    fn git_with(runner: &Arc<ScriptedRunner>) -> Git {
        Git::new("git", "/repo", runner.clone())
    }

    #[test]
    fn remote_branch_probe_maps_exit_codes() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok(""), fail(2, ""), fail(128, "fatal")]));
        let git = git_with(&runner);
        assert!(git.remote_branch_exists("origin", "edit").expect("present"));
        assert!(!git.remote_branch_exists("origin", "edit").expect("absent"));
        let err = git.remote_branch_exists("origin", "edit").expect_err("broken");
        assert!(matches!(err, PanelError::Tool { code: Some(128), .. }));
    }

    #[test]
    fn staged_changes_probe_maps_exit_codes() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok(""), fail(1, ""), fail(129, "usage")]));
        let git = git_with(&runner);
        assert!(!git.has_staged_changes().expect("clean"));
        assert!(git.has_staged_changes().expect("dirty"));
        assert!(git.has_staged_changes().is_err());
    }

    #[test]
    fn commit_passes_author_after_message() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok("[edit 1a2b3c4] Rent\n")]));
        let git = git_with(&runner);
        git.commit("Rent", Some("ram <ram@example.com>")).expect("commit");
        assert_eq!(
            runner.invocations(),
            vec!["git commit -m Rent --author ram <ram@example.com>"]
        );
    }

    #[test]
    fn run_op_surfaces_stderr() {
        let runner = Arc::new(ScriptedRunner::new(vec![fail(1, "error: pathspec 'nope'")]));
        let git = git_with(&runner);
        let op = GitOp::from_tokens(&["checkout", "nope"]).expect("op");
        let err = git.run_op(&op).expect_err("fails");
        assert!(err.to_string().contains("error: pathspec 'nope'"));
    }
}
