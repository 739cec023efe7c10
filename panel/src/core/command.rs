//! Validation of user-submitted git command requests.
//!
//! Requests arrive as free-form token arrays; the only way to obtain a
//! runnable [`GitOp`] is [`GitOp::from_tokens`], which rejects anything
//! outside the closed [`Subcommand`] set before a process is spawned.

use std::fmt;
use std::str::FromStr;

use crate::error::{PanelError, PanelResult};

/// Git subcommands the panel is willing to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcommand {
    Show,
    Status,
    Log,
    Diff,
    Pull,
    Push,
    Add,
    Commit,
    Checkout,
    Branch,
    Reset,
    Merge,
}

impl Subcommand {
    pub const ALL: [Subcommand; 12] = [
        Subcommand::Show,
        Subcommand::Status,
        Subcommand::Log,
        Subcommand::Diff,
        Subcommand::Pull,
        Subcommand::Push,
        Subcommand::Add,
        Subcommand::Commit,
        Subcommand::Checkout,
        Subcommand::Branch,
        Subcommand::Reset,
        Subcommand::Merge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subcommand::Show => "show",
            Subcommand::Status => "status",
            Subcommand::Log => "log",
            Subcommand::Diff => "diff",
            Subcommand::Pull => "pull",
            Subcommand::Push => "push",
            Subcommand::Add => "add",
            Subcommand::Commit => "commit",
            Subcommand::Checkout => "checkout",
            Subcommand::Branch => "branch",
            Subcommand::Reset => "reset",
            Subcommand::Merge => "merge",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subcommand {
    type Err = PanelError;

    fn from_str(s: &str) -> PanelResult<Self> {
        Subcommand::ALL
            .into_iter()
            .find(|sub| sub.as_str() == s)
            .ok_or_else(|| PanelError::Forbidden(s.to_string()))
    }
}

/// A validated git operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOp {
    /// `git commit -m <message>`.
    Commit { message: String },
    /// Any other allowed subcommand with its arguments passed through.
    Passthrough {
        subcommand: Subcommand,
        args: Vec<String>,
    },
}

impl GitOp {
    /// Validate a token array such as `["log", "--oneline"]`.
    ///
    /// `commit` must be written as `commit -m <words..>`; the words are joined
    /// with single spaces into one message.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> PanelResult<Self> {
        let (first, rest) = tokens
            .split_first()
            .ok_or_else(|| PanelError::validation("Invalid request: empty command"))?;
        let subcommand: Subcommand = first.as_ref().parse()?;

        if subcommand == Subcommand::Commit {
            return match rest {
                [flag, words @ ..] if flag.as_ref() == "-m" && !words.is_empty() => {
                    let message = words
                        .iter()
                        .map(|w| w.as_ref())
                        .collect::<Vec<&str>>()
                        .join(" ");
                    Ok(GitOp::Commit { message })
                }
                _ => Err(PanelError::validation(
                    "Invalid commit format. Use: commit -m \"message\"",
                )),
            };
        }

        Ok(GitOp::Passthrough {
            subcommand,
            args: rest.iter().map(|t| t.as_ref().to_string()).collect(),
        })
    }

    pub fn subcommand(&self) -> Subcommand {
        match self {
            GitOp::Commit { .. } => Subcommand::Commit,
            GitOp::Passthrough { subcommand, .. } => *subcommand,
        }
    }

    /// Arguments to hand to `git`, subcommand first.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            GitOp::Commit { message } => {
                vec!["commit".to_string(), "-m".to_string(), message.clone()]
            }
            GitOp::Passthrough { subcommand, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(subcommand.as_str().to_string());
                out.extend(args.iter().cloned());
                out
            }
        }
    }
}
