//! # Parrot Core
//! Shared types, traits, configuration and error handling for the bot.
//!
//! Everything that more than one crate needs lives here: the [`Room`]
//! transport boundary, the [`Command`] capability, the process-wide
//! [`BotState`] flags and the [`RateLimitCache`] used for cooldowns.

pub mod config;
pub mod cooldown;
pub mod error;
pub mod guard;
pub mod state;
pub mod traits;
pub mod types;

pub use config::ParrotConfig;
pub use cooldown::RateLimitCache;
pub use error::{ParrotError, Result};
pub use state::BotState;
pub use traits::{Capabilities, Command, Room};
pub use types::{FileEvent, Message};
