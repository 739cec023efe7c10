//! I/O helpers for panel operations.

pub mod bean_query;
pub mod config;
pub mod gh;
pub mod git;
pub mod process;
pub mod reports;
pub mod worktree;
