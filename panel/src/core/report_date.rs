//! Report dates and the `report-<date>.<ext>` naming scheme.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{PanelError, PanelResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

static REPORT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^report-(\d{4}-\d{2}-\d{2})\.(pdf|no-data)$").expect("valid report regex")
});

/// A calendar date accepted by the statement downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportDate(NaiveDate);

impl ReportDate {
    /// Parse a strict `YYYY-MM-DD` date.
    pub fn parse(raw: &str) -> PanelResult<Self> {
        let invalid = || PanelError::validation(format!("Invalid date string: '{raw}' (expected YYYY-MM-DD)"));
        if raw.len() != 10 {
            return Err(invalid());
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl From<NaiveDate> for ReportDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// What the downloader recorded for a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Pdf,
    /// The bank had no transactions for the day.
    NoData,
}

/// A file name that follows the report naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportName {
    pub date: ReportDate,
    pub kind: ReportKind,
}

impl ReportName {
    /// Parse `report-YYYY-MM-DD.pdf` / `report-YYYY-MM-DD.no-data`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = REPORT_NAME.captures(file_name)?;
        let date = ReportDate::parse(caps.get(1)?.as_str()).ok()?;
        let kind = match caps.get(2)?.as_str() {
            "pdf" => ReportKind::Pdf,
            _ => ReportKind::NoData,
        };
        Some(Self { date, kind })
    }
}

/// Newest report date among `file_names`, never earlier than `floor`.
pub fn latest_report_date<'a, I>(file_names: I, floor: ReportDate) -> ReportDate
where
    I: IntoIterator<Item = &'a str>,
{
    file_names
        .into_iter()
        .filter_map(ReportName::parse)
        .map(|name| name.date)
        .fold(floor, Ord::max)
}
