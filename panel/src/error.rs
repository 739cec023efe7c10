//! Failure classification for panel operations.
//!
//! Request validation problems never reach a subprocess; tool failures carry
//! the captured output verbatim so callers can show it to the user.

use thiserror::Error;

pub type PanelResult<T> = std::result::Result<T, PanelError>;

#[derive(Debug, Error)]
pub enum PanelError {
    /// Malformed request: bad JSON, empty command, bad commit syntax, bad date.
    #[error("{0}")]
    Validation(String),

    /// Git subcommand outside the allowed set.
    #[error("forbidden command: {0}")]
    Forbidden(String),

    /// External tool exited non-zero.
    #[error("{step} failed (exit {exit}):\n{detail}", exit = display_code(.code), detail = tool_detail(.stdout, .stderr))]
    Tool {
        step: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// External tool was killed after exceeding its time budget.
    #[error("{step} timed out after {secs}s")]
    Timeout { step: String, secs: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PanelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors caused by the request itself (nothing was executed).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Forbidden(_))
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn tool_detail(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim_end();
    let stdout = stdout.trim_end();
    match (stderr.is_empty(), stdout.is_empty()) {
        (false, false) => format!("{stderr}\n{stdout}"),
        (false, true) => stderr.to_string(),
        (true, false) => stdout.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_shows_stderr_before_stdout() {
        let err = PanelError::Tool {
            step: "git merge origin/main".to_string(),
            code: Some(1),
            stdout: "Auto-merging main.bean\n".to_string(),
            stderr: "CONFLICT (content)\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "git merge origin/main failed (exit 1):\nCONFLICT (content)\nAuto-merging main.bean"
        );
    }

    #[test]
    fn killed_tool_reports_signal() {
        let err = PanelError::Tool {
            step: "gh pr create".to_string(),
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "gh pr create failed (exit signal):\n");
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(PanelError::validation("empty command").is_client_error());
        assert!(PanelError::Forbidden("rebase".to_string()).is_client_error());
        assert!(
            !PanelError::Timeout {
                step: "git fetch origin".to_string(),
                secs: 1
            }
            .is_client_error()
        );
    }
}
