//! Error type shared by all Parrot crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParrotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Room error: {0}")]
    Room(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

pub type Result<T> = std::result::Result<T, ParrotError>;
