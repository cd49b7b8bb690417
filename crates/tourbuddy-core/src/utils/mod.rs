//! Utility functions for display formatting and input parsing.

pub mod format;

pub use format::{format_amount, format_datetime, parse_datetime, round_cents, truncate_string};
