//! Bank statement report directory and downloader invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::core::report_date::{ReportDate, ReportKind, ReportName, latest_report_date};
use crate::error::PanelResult;
use crate::io::process::{CommandRunner, ToolCommand, run_tool_checked};

/// A downloaded report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub date: ReportDate,
    pub kind: ReportKind,
    /// Path relative to the report directory, with `/` separators.
    pub relative_path: String,
}

/// Report files under `dir` (recursively), newest first.
pub fn list_reports(dir: &Path) -> PanelResult<Vec<ReportFile>> {
    let mut reports = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().and_then(ReportName::parse) else {
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        reports.push(ReportFile {
            date: name.date,
            kind: name.kind,
            relative_path: relative,
        });
    }
    reports.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
    Ok(reports)
}

/// Newest downloaded report date under `dir`, or `floor` if none is newer.
///
/// A missing directory is an error.
pub fn last_report_date(dir: &Path, floor: ReportDate) -> PanelResult<ReportDate> {
    let reports = list_reports(dir)?;
    let latest = latest_report_date(reports.iter().map(|r| file_name(&r.relative_path)), floor);
    debug!(latest = %latest, scanned = reports.len(), "last report date");
    Ok(latest)
}

fn file_name(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

/// Runs the statement downloader for an inclusive date range.
#[derive(Clone)]
pub struct Downloader {
    command: Vec<String>,
    workdir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Downloader {
    pub fn new(command: Vec<String>, workdir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            command,
            workdir: workdir.into(),
            runner,
        }
    }

    #[instrument(skip_all, fields(from = %from, to = %to))]
    pub fn download(&self, from: ReportDate, to: ReportDate) -> PanelResult<String> {
        let (program, base_args) = self
            .command
            .split_first()
            .context("downloader command is empty")?;
        let args = base_args
            .iter()
            .cloned()
            .chain([from.to_string(), to.to_string()]);
        let cmd = ToolCommand::new(program, args, &self.workdir);
        info!("downloading statements");
        Ok(run_tool_checked(self.runner.as_ref(), &cmd)?.stdout)
    }
}
