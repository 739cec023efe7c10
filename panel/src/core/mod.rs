//! Pure, deterministic panel logic (no I/O).

pub mod command;
pub mod message;
pub mod report_date;
