//! Format-specific parsers.

pub mod calendar;
pub mod tasks;
pub mod template;
