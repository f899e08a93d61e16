//! Command-line surface.

pub mod commands;
pub mod runtime;
pub mod skill_file;
