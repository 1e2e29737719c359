//! Formatting helpers for CLI output and log lines.

pub mod format;

pub use format::{format_remaining, short_address, truncate_string};
