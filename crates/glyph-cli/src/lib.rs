//! Glyph CLI library.
//!
//! This crate provides the command implementations behind the `glyph`
//! binary: document loading, extension definitions, resolution and
//! reporting.

pub mod commands;
pub mod input;
pub mod logging;
