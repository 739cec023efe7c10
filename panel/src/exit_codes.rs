//! Stable exit codes for the `panel` CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid request, configuration, or a failing external tool.
pub const INVALID: i32 = 1;
/// `panel publish` found nothing to commit.
pub const NO_CHANGES: i32 = 2;
