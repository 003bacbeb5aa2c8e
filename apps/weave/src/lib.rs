//! # Weave
//!
//! Library half of the `weave` binary: CLI definitions, command
//! implementations and configuration loading, exposed for integration tests.

pub mod cli;
pub mod config;
