//! External command execution.

pub mod command;

pub use command::{run, run_checked, CommandOptions, CommandResult, DEFAULT_TIMEOUT};
