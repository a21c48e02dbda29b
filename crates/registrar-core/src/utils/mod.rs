//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{cell_text, format_date, truncate};
