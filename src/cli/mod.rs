//! CLI module - argument parsing and the convert subcommand

pub mod args;
pub mod convert;

pub use args::{Cli, Commands};
pub use convert::run_convert;
