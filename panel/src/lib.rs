//! Local control panel for a plain-text accounting repository.
//!
//! The panel drives three external tools on the user's behalf: `git` for
//! whitelisted commands and the commit-and-publish flow, `gh` for pull
//! requests, and `bean-query` for ledger reports, plus a statement
//! downloader. The crate is split the same way the work is:
//!
//! - **[`core`]**: Pure request validation and naming rules. No I/O.
//! - **[`io`]**: Subprocess adapters, configuration, and the working tree lock.
//!
//! [`sync`] holds the publish orchestration and [`panel::Panel`] ties
//! everything to one configured repository for the front ends.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod panel;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{PanelError, PanelResult};
pub use panel::Panel;
