//! Output formatting module

pub mod formatter;
pub mod report;
