//! End-to-end publish against real git repositories.
//!
//! A bare repository stands in for `origin` and a small shell script stands in
//! for `gh`, recording its arguments and remembering the PR it "created".

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use panel::Panel;
use panel::io::config::PanelConfig;
use panel::sync::{PublishOutcome, PublishRequest};
use panel::test_support::TestRepo;

const PR_URL: &str = "https://github.com/acme/books/pull/1";

struct FakeGh {
    _dir: tempfile::TempDir,
    script: PathBuf,
    log: PathBuf,
}

impl FakeGh {
    fn install() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("gh");
        let log = dir.path().join("gh.log");
        let state = dir.path().join("pr-url");
        let body = format!(
            r#"#!/bin/sh
echo "$*" >> '{log}'
case "$2" in
  list)
    if [ -f '{state}' ]; then printf '[{{"url":"%s"}}]\n' "$(cat '{state}')"; else echo '[]'; fi ;;
  create)
    echo '{url}' > '{state}'
    echo 'Creating pull request for edit into main'
    echo '{url}' ;;
  *) echo "unexpected gh call: $*" >&2; exit 1 ;;
esac
"#,
            log = log.display(),
            state = state.display(),
            url = PR_URL,
        );
        fs::write(&script, body).expect("write fake gh");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");
        Self {
            _dir: dir,
            script,
            log,
        }
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn panel_for(repo: &Path, gh: &FakeGh) -> Panel {
    let mut cfg = PanelConfig {
        repo_path: repo.to_path_buf(),
        ..PanelConfig::default()
    };
    cfg.tools.gh = gh.script.to_string_lossy().into_owned();
    Panel::with_process_runner(cfg.resolve().expect("resolve config"))
}

fn add_data() -> PublishRequest {
    PublishRequest {
        message: Some("Add data".to_string()),
        author: None,
    }
}

#[test]
fn publishes_only_the_ledger_file_and_opens_one_pr() {
    let repo = TestRepo::new().expect("repo");
    let gh = FakeGh::install();
    let panel = panel_for(repo.path(), &gh);

    repo.append("main.bean", "2025-02-01 * \"Room 4\" \"Cash\"")
        .expect("edit ledger");
    fs::write(repo.path().join("notes.txt"), "scratch\n").expect("write notes");

    let outcome = panel.publish(&add_data()).expect("publish");
    assert_eq!(
        outcome,
        PublishOutcome::Published {
            pr_url: PR_URL.to_string(),
            created: true
        }
    );

    assert_eq!(
        repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]).expect("branch"),
        "edit"
    );
    assert_eq!(
        repo.git(&["show", "--name-only", "--format=", "HEAD"])
            .expect("show"),
        "main.bean"
    );
    assert_eq!(
        repo.git(&["log", "-1", "--format=%s"]).expect("log"),
        "Add data"
    );
    let remote_edit = repo
        .git(&["ls-remote", "--heads", "origin", "edit"])
        .expect("ls-remote");
    assert!(remote_edit.ends_with("refs/heads/edit"), "{remote_edit}");
    assert!(
        repo.git(&["status", "--porcelain"])
            .expect("status")
            .contains("?? notes.txt")
    );

    let again = panel.publish(&add_data()).expect("second publish");
    assert_eq!(again, PublishOutcome::NoChanges);

    let creates = gh.calls().iter().filter(|c| c.starts_with("pr create")).count();
    assert_eq!(creates, 1);
}

#[test]
fn later_edits_reuse_the_open_pr() {
    let repo = TestRepo::new().expect("repo");
    let gh = FakeGh::install();
    let panel = panel_for(repo.path(), &gh);

    repo.append("main.bean", "2025-02-01 * \"Room 4\"").expect("edit 1");
    panel.publish(&add_data()).expect("first publish");

    repo.append("main.bean", "2025-02-02 * \"Room 5\"").expect("edit 2");
    let outcome = panel.publish(&add_data()).expect("second publish");

    assert_eq!(
        outcome,
        PublishOutcome::Published {
            pr_url: PR_URL.to_string(),
            created: false
        }
    );
    let commits = repo
        .git(&["rev-list", "--count", "origin/main..origin/edit"])
        .expect("rev-list");
    assert_eq!(commits, "2");
    assert_eq!(
        gh.calls().iter().filter(|c| c.starts_with("pr create")).count(),
        1
    );
}

#[test]
fn passthrough_runs_in_the_repository() {
    let repo = TestRepo::new().expect("repo");
    let gh = FakeGh::install();
    let panel = panel_for(repo.path(), &gh);

    let log = panel.run_git(&["log", "--format=%s"]).expect("git log");
    assert_eq!(log.trim(), "Initial ledger");

    repo.append("main.bean", "; comment").expect("edit");
    let diff = panel.diff().expect("diff");
    assert!(diff.contains("+; comment"));
}
