//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed to by
//! [`CommandDispatcher`], which loads configuration once for all of them.

pub mod dispatcher;
pub mod find;
pub mod survey;

pub use dispatcher::{Command, CommandContext, CommandDispatcher, CommandResult};
