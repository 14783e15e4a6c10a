//! Tooling Layer
//!
//! Command-line access to the catalog: running the HTTP server and
//! inspecting the product snapshot offline.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
