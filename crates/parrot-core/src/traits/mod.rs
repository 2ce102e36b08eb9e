//! Trait seams between the engine and its collaborators.

pub mod command;
pub mod room;

pub use command::{Capabilities, Command};
pub use room::Room;
