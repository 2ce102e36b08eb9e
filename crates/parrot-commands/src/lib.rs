//! # Parrot Commands
//!
//! Everything that happens inside one room:
//! - [`registry::CommandRegistry`]: builds the room's commands, sorted by name
//! - [`dispatch::Dispatcher`]: first-claim, fault-isolated chat/file/pulse dispatch
//! - [`context::CommandContext`]: what commands use to talk back
//! - [`builtin`]: the commands shipped with the bot

pub mod builtin;
pub mod context;
pub mod dispatch;
pub mod registry;

pub use context::CommandContext;
pub use dispatch::{DispatchOutcome, Dispatcher, IgnoreReason};
pub use registry::{Category, CommandFactory, CommandRegistry};
