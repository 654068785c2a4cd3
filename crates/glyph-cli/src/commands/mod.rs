//! CLI command implementations

pub mod info;
pub mod resolve;

mod reporting;
