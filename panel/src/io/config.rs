//! Panel configuration, optionally loaded from a TOML file.
//!
//! The configuration is resolved once at startup and then passed by
//! reference; nothing in the crate reads the environment on its own.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Panel configuration (TOML).
///
/// Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PanelConfig {
    /// Working tree of the accounting repository.
    pub repo_path: PathBuf,

    /// Browser URL of the repository, linked from the page header.
    pub repo_url: String,

    /// Remote that branches are fetched from and pushed to.
    pub remote: String,

    /// Branch that accumulates ledger edits before review.
    pub working_branch: String,

    /// Upstream integration branch merged into the working branch.
    pub main_branch: String,

    /// The single ledger file staged by the publish flow.
    pub tracked_file: String,

    pub default_commit_message: String,

    /// Commit messages longer than this many characters are cut and marked.
    pub commit_message_limit: usize,

    /// Wall-clock budget for each external command.
    pub command_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,

    /// Request header carrying the authenticated user's e-mail.
    pub author_header: String,

    pub tools: ToolsConfig,

    pub reports: ReportsConfig,

    /// Ledger queries listed on the page for copy/paste.
    pub queries: Vec<String>,
}

/// Program names (or paths) for the external tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub git: String,
    pub gh: String,
    pub bean_query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportsConfig {
    /// Report directory, relative to `repo_path` unless absolute.
    pub dir: PathBuf,

    /// Floor returned when no newer report has been downloaded yet.
    pub start_date: NaiveDate,

    /// Downloader command; `<from> <to>` dates are appended.
    /// Runs in the parent of the report directory.
    pub downloader: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            gh: "gh".to_string(),
            bean_query: "bean-query".to_string(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("hbl-swipe-statements/reports"),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            downloader: vec![
                "go".to_string(),
                "run".to_string(),
                "download.go".to_string(),
            ],
        }
    }
}

const INCOME_BY_MONTH_QUERY: &str = r#"SELECT
    YEAR(date) AS year,
    MONTH(date) AS month,
    account,
    SUM(position) AS total
WHERE
    account ~ "Income:Room" OR account ~ "Income:Restaurant"
GROUP BY
    year, month, account
ORDER BY
    year ASC, month ASC, account ASC"#;

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            repo_url: "https://github.com/sumanchapai/superview-accounting".to_string(),
            remote: "origin".to_string(),
            working_branch: "edit".to_string(),
            main_branch: "main".to_string(),
            tracked_file: "main.bean".to_string(),
            default_commit_message: "Add data".to_string(),
            commit_message_limit: 300,
            command_timeout_secs: 5 * 60,
            output_limit_bytes: 1_000_000,
            author_header: "Cf-Access-Authenticated-User-Email".to_string(),
            tools: ToolsConfig::default(),
            reports: ReportsConfig::default(),
            queries: vec![INCOME_BY_MONTH_QUERY.to_string()],
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("remote", &self.remote),
            ("working_branch", &self.working_branch),
            ("main_branch", &self.main_branch),
            ("tracked_file", &self.tracked_file),
            ("default_commit_message", &self.default_commit_message),
            ("author_header", &self.author_header),
            ("tools.git", &self.tools.git),
            ("tools.gh", &self.tools.gh),
            ("tools.bean_query", &self.tools.bean_query),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        if self.working_branch == self.main_branch {
            return Err(anyhow!(
                "working_branch and main_branch must differ (both are '{}')",
                self.main_branch
            ));
        }
        if self.commit_message_limit == 0 {
            return Err(anyhow!("commit_message_limit must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.reports.downloader.is_empty() || self.reports.downloader[0].trim().is_empty() {
            return Err(anyhow!("reports.downloader must be a non-empty array"));
        }
        Ok(())
    }

    /// Validate and pin `repo_path` to an absolute, existing directory.
    ///
    /// Fails when the repository directory is missing, so a misconfigured
    /// panel never starts serving.
    pub fn resolve(mut self) -> Result<Self> {
        self.validate()?;
        let absolute = self
            .repo_path
            .canonicalize()
            .with_context(|| format!("repo directory does not exist: {}", self.repo_path.display()))?;
        if !absolute.is_dir() {
            return Err(anyhow!("repo path is not a directory: {}", absolute.display()));
        }
        self.repo_path = absolute;
        Ok(self)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Absolute report directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.repo_path.join(&self.reports.dir)
    }

    /// Working directory for the downloader (parent of the report directory).
    pub fn downloader_dir(&self) -> PathBuf {
        let dir = self.reports_dir();
        match dir.parent() {
            Some(parent) => parent.to_path_buf(),
            None => dir,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PanelConfig::default()`.
pub fn load_config(path: &Path) -> Result<PanelConfig> {
    if !path.exists() {
        let cfg = PanelConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PanelConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PanelConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("panel.toml");
        fs::write(
            &path,
            "working_branch = \"drafts\"\ncommit_message_limit = 72\n\n[reports]\nstart_date = \"2024-06-01\"\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.working_branch, "drafts");
        assert_eq!(cfg.commit_message_limit, 72);
        assert_eq!(cfg.main_branch, "main");
        assert_eq!(
            cfg.reports.start_date,
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
        );
        assert_eq!(cfg.reports.downloader, ReportsConfig::default().downloader);
    }

    #[test]
    fn rejects_same_working_and_main_branch() {
        let cfg = PanelConfig {
            working_branch: "main".to_string(),
            ..PanelConfig::default()
        };
        let err = cfg.validate().expect_err("must fail");
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = PanelConfig {
            command_timeout_secs: 0,
            ..PanelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resolve_fails_for_missing_repo() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = PanelConfig {
            repo_path: temp.path().join("nope"),
            ..PanelConfig::default()
        };
        let err = cfg.resolve().expect_err("missing repo");
        assert!(format!("{err:#}").contains("repo directory does not exist"));
    }

    #[test]
    fn resolve_makes_repo_path_absolute() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = PanelConfig {
            repo_path: temp.path().to_path_buf(),
            ..PanelConfig::default()
        }
        .resolve()
        .expect("resolve");
        assert!(cfg.repo_path.is_absolute());
        assert_eq!(
            cfg.downloader_dir(),
            cfg.repo_path.join("hbl-swipe-statements")
        );
    }
}
