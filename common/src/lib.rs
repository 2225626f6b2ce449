//! Types and helpers shared by the booth controller crates.

pub mod config;
pub mod format;
pub mod protocol;
