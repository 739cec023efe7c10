//! Commit-and-publish flow for ledger edits.
//!
//! Brings the working branch up to date with its remote counterpart and the
//! remote main branch, commits the tracked ledger file, pushes, and makes sure
//! exactly one open pull request carries the branch.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::core::message::{AuthorIdentity, commit_message};
use crate::error::PanelResult;
use crate::io::config::PanelConfig;
use crate::io::gh::GhCli;
use crate::io::git::Git;
use crate::io::worktree::WorktreeGuard;

/// Caller-supplied inputs for a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishRequest {
    /// Commit message; blank or missing falls back to the configured default.
    pub message: Option<String>,
    /// Recorded as commit author when present.
    pub author: Option<AuthorIdentity>,
}

/// Result of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The tracked file matches the last commit; nothing was pushed.
    NoChanges,
    Published {
        pr_url: String,
        /// False when an already-open PR was reused.
        created: bool,
    },
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::NoChanges => f.write_str("No changes to commit"),
            PublishOutcome::Published { pr_url, .. } => f.write_str(pr_url),
        }
    }
}

/// Run the full publish sequence while holding the working tree.
///
/// Steps run strictly in order and none is retried; the first failing tool
/// aborts the sequence with its captured output. A failed merge is aborted
/// (`git merge --abort`) before the error is returned so the working branch is
/// left at its pre-merge commit.
#[instrument(skip_all, fields(branch = %cfg.working_branch))]
pub fn synchronize_and_publish(
    git: &Git,
    gh: &GhCli,
    cfg: &PanelConfig,
    request: &PublishRequest,
    _worktree: &WorktreeGuard<'_>,
) -> PanelResult<PublishOutcome> {
    let branch = cfg.working_branch.as_str();
    let remote = cfg.remote.as_str();

    let current = git.current_branch()?;
    if current != branch {
        debug!(from = %current, "switching to working branch");
        git.checkout_reset_branch(branch)?;
    }

    git.fetch(remote)?;
    for upstream in [branch, cfg.main_branch.as_str()] {
        if git.remote_branch_exists(remote, upstream)? {
            merge_or_abort(git, &format!("{remote}/{upstream}"))?;
        } else {
            debug!(upstream, "no remote branch to merge");
        }
    }

    git.add(&cfg.tracked_file)?;
    if !git.has_staged_changes()? {
        info!("tracked file unchanged, nothing to publish");
        return Ok(PublishOutcome::NoChanges);
    }

    let message = commit_message(
        request.message.as_deref(),
        &cfg.default_commit_message,
        cfg.commit_message_limit,
    );
    let author = request.author.as_ref().map(AuthorIdentity::to_author_arg);
    git.commit(&message, author.as_deref())?;

    git.push_upstream(remote, branch)?;

    if let Some(pr_url) = gh.open_pr_url(branch)? {
        info!(pr_url = %pr_url, "reusing open pull request");
        return Ok(PublishOutcome::Published {
            pr_url,
            created: false,
        });
    }
    let pr_url = gh.create_pr(branch)?;
    Ok(PublishOutcome::Published {
        pr_url,
        created: true,
    })
}

fn merge_or_abort(git: &Git, rev: &str) -> PanelResult<()> {
    let Err(err) = git.merge(rev) else {
        return Ok(());
    };
    warn!(rev, "merge failed, aborting");
    if let Err(abort_err) = git.merge_abort() {
        warn!(err = %abort_err, "merge --abort failed");
    }
    Err(err)
}
