//! Test-only helpers: a scripted command runner and throwaway git repositories.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;

use crate::io::process::{CommandRunner, ToolCommand, ToolOutput};

/// Successful output with the given stdout.
pub fn ok(stdout: &str) -> ToolOutput {
    ToolOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        ..ToolOutput::default()
    }
}

/// Failed output with the given exit code and stderr.
pub fn fail(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput {
        code: Some(code),
        stderr: stderr.to_string(),
        ..ToolOutput::default()
    }
}

/// Output of a command killed by the timeout.
pub fn timed_out() -> ToolOutput {
    ToolOutput {
        code: None,
        timed_out: true,
        ..ToolOutput::default()
    }
}

/// Runner that replays queued outputs in order and records every command.
///
/// Running past the end of the script is an error, which makes unexpected
/// extra invocations fail loudly.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<ToolOutput>>,
    commands: Mutex<Vec<ToolCommand>>,
}

impl ScriptedRunner {
    pub fn new(replies: Vec<ToolOutput>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Every command run so far.
    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Every command run so far, rendered as `program arg..`.
    pub fn invocations(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    /// Replies not consumed yet.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        self.commands
            .lock()
            .map_err(|_| anyhow!("command log poisoned"))?
            .push(command.clone());
        self.replies
            .lock()
            .map_err(|_| anyhow!("reply queue poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("unscripted command: {command}"))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// A real git repository with a bare `origin`, both in a temp directory.
///
/// The work tree starts on `main` with one commit containing `main.bean`,
/// already pushed to `origin`.
pub struct TestRepo {
    _temp: TempDir,
    work: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let work = temp.path().join("work");
        let remote = temp.path().join("origin.git");
        fs::create_dir_all(&work).context("create work dir")?;

        git(temp.path(), &["init", "--bare", "origin.git"])?;
        git(&work, &["init"])?;
        git(&work, &["config", "user.name", "Panel Test"])?;
        git(&work, &["config", "user.email", "panel@example.com"])?;
        git(&work, &["config", "commit.gpgsign", "false"])?;
        git(&work, &["checkout", "-b", "main"])?;
        fs::write(work.join("main.bean"), "2025-01-01 open Assets:Cash NPR\n")
            .context("write main.bean")?;
        git(&work, &["add", "main.bean"])?;
        git(&work, &["commit", "-m", "Initial ledger"])?;
        let remote_arg = remote.to_string_lossy().into_owned();
        git(&work, &["remote", "add", "origin", &remote_arg])?;
        git(&work, &["push", "-u", "origin", "main"])?;

        Ok(Self { _temp: temp, work })
    }

    pub fn path(&self) -> &Path {
        &self.work
    }

    /// Append a line to a file in the work tree.
    pub fn append(&self, file: &str, line: &str) -> Result<()> {
        let path = self.work.join(file);
        let mut contents = fs::read_to_string(&path).unwrap_or_default();
        contents.push_str(line);
        contents.push('\n');
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    /// Run git in the work tree and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        git(&self.work, args)
    }
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
