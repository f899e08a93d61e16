//! PagePilot CLI library.
//!
//! The automation core itself lives in the workspace crates; this
//! package wires it to a command-line surface for validating, viewing,
//! and dry-running stored skills.

pub mod cli;
pub mod config;

pub use config::PagePilotConfig;
