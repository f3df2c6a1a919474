//! Rendering of scoring results

pub mod formatter;
pub mod report;
