//! CLI for herd suite orchestration.

pub mod cli;
pub mod commands;
pub mod logging;
