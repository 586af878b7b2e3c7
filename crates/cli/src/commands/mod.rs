//! CLI command implementations.

pub mod config;
pub mod manifest;
pub mod migrate;
