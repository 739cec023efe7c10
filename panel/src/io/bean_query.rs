//! `bean-query` adapter. The query text is handed over untouched.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::instrument;

use crate::error::{PanelError, PanelResult};
use crate::io::process::{CommandRunner, ToolCommand, run_tool_checked};

#[derive(Clone)]
pub struct BeanQuery {
    program: String,
    workdir: PathBuf,
    ledger_file: String,
    runner: Arc<dyn CommandRunner>,
}

impl BeanQuery {
    pub fn new(
        program: impl Into<String>,
        workdir: impl Into<PathBuf>,
        ledger_file: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
            ledger_file: ledger_file.into(),
            runner,
        }
    }

    /// Run `query` against the ledger file and return the rendered table.
    #[instrument(skip_all, fields(query_len = query.len()))]
    pub fn run(&self, query: &str) -> PanelResult<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PanelError::validation("Please enter a query."));
        }
        let cmd = ToolCommand::new(
            &self.program,
            [self.ledger_file.as_str(), query],
            &self.workdir,
        );
        Ok(run_tool_checked(self.runner.as_ref(), &cmd)?.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedRunner, ok};

    #[test]
    fn passes_ledger_then_query() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok("year month\n")]));
        let bq = BeanQuery::new("bean-query", "/repo", "main.bean", runner.clone());
        let out = bq.run("  select date  \n").expect("query");
        assert_eq!(out, "year month\n");
        assert_eq!(runner.invocations(), vec!["bean-query main.bean select date"]);
    }

    #[test]
    fn empty_query_never_spawns() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let bq = BeanQuery::new("bean-query", "/repo", "main.bean", runner.clone());
        assert!(matches!(bq.run(" \n"), Err(PanelError::Validation(_))));
        assert!(runner.invocations().is_empty());
    }
}
