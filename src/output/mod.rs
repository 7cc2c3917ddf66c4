//! Output module for graph reports
//!
//! This module handles:
//! - Loading per-domain graph statistics
//! - Printing them to the terminal
//! - Rendering them as a markdown report

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, BrokenTarget, GraphStatistics};
