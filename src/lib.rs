//! commitcraft: generate Git commit messages from diffs with an LLM.
//!
//! The library half of the crate: the binary in `main.rs` wires these
//! modules together, and the integration tests drive them directly.

pub mod cli_args;
pub mod config;
pub mod git;
pub mod llm;
pub mod logging;
pub mod setup;
