//! HTML pages rendered from embedded minijinja templates.

use minijinja::{Environment, context};
use panel::core::report_date::ReportKind;
use panel::io::config::PanelConfig;
use panel::io::reports::ReportFile;
use serde::Serialize;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const REPORTS_TEMPLATE: &str = include_str!("../templates/reports.html");

#[derive(Debug, Serialize)]
struct ReportRow {
    date: String,
    kind: &'static str,
    href: String,
}

impl ReportRow {
    fn from_report(report: &ReportFile) -> Self {
        Self {
            date: report.date.to_string(),
            kind: match report.kind {
                ReportKind::Pdf => "pdf",
                ReportKind::NoData => "no data",
            },
            href: format!("/git/hbl/files/{}", report.relative_path),
        }
    }
}

pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)
            .expect("index template should be valid");
        env.add_template("reports.html", REPORTS_TEMPLATE)
            .expect("reports template should be valid");
        Self { env }
    }

    pub fn index(&self, cfg: &PanelConfig) -> Result<String, minijinja::Error> {
        let template = self.env.get_template("index.html")?;
        template.render(context! {
            repo_url => cfg.repo_url,
            working_branch => cfg.working_branch,
            tracked_file => cfg.tracked_file,
            queries => cfg.queries.iter().map(|q| q.trim()).collect::<Vec<_>>(),
        })
    }

    pub fn reports(&self, reports: &[ReportFile]) -> Result<String, minijinja::Error> {
        let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from_report).collect();
        let template = self.env.get_template("reports.html")?;
        template.render(context! { reports => rows })
    }
}

#[cfg(test)]
mod tests {
    use panel::core::report_date::ReportDate;

    use super::*;

    #[test]
    fn index_lists_repo_link_and_queries() {
        let cfg = PanelConfig {
            repo_url: "https://github.com/acme/books".to_string(),
            queries: vec!["SELECT account WHERE number > 0".to_string()],
            ..PanelConfig::default()
        };
        let html = Pages::new().index(&cfg).expect("render");
        assert!(html.contains("github.com"));
        assert!(html.contains("acme"));
        // Autoescaped because the template name ends in .html.
        assert!(html.contains("SELECT account WHERE number &gt; 0"));
    }

    #[test]
    fn reports_page_links_files() {
        let reports = vec![ReportFile {
            date: ReportDate::parse("2025-03-02").expect("date"),
            kind: ReportKind::NoData,
            relative_path: "report-2025-03-02.no-data".to_string(),
        }];
        let html = Pages::new().reports(&reports).expect("render");
        assert!(html.contains("report-2025-03-02.no-data"));
        assert!(html.contains("2025-03-02</a>"));
        assert!(html.contains("no data"));
    }
}
