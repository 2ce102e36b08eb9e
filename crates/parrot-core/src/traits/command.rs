//! Command trait: a pluggable chat handler.
//!
//! A command always handles chat. File and pulse handling are opt-in
//! capabilities reported by [`Command::capabilities`]; the registry uses
//! that tag, never the concrete type, to decide which lists a command
//! joins.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{FileEvent, Message};

/// Optional capabilities of a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Receives [`FileEvent`]s via [`Command::on_file`].
    pub file: bool,
    /// Receives pulses via [`Command::on_pulse`], at most once per interval.
    pub pulse: Option<Duration>,
}

impl Capabilities {
    pub fn chat_only() -> Self {
        Self::default()
    }

    pub fn with_file(mut self) -> Self {
        self.file = true;
        self
    }

    pub fn with_pulse(mut self, interval: Duration) -> Self {
        self.pulse = Some(interval);
        self
    }
}

pub trait Command: Send {
    /// Stable name; the registry orders commands by it.
    fn name(&self) -> &str;

    /// Literal trigger strings, already lower-cased.
    fn triggers(&self) -> &[&'static str] {
        &[]
    }

    /// Whether this command wants to see `cmd`.
    fn handles(&self, cmd: &str) -> bool {
        self.triggers().contains(&cmd)
    }

    /// Handle a chat command. `Ok(true)` claims the message.
    fn invoke(&mut self, cmd: &str, remainder: &str, msg: &Message) -> Result<bool>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::chat_only()
    }

    /// Handle an upload. `Ok(true)` claims it.
    fn on_file(&mut self, _file: &FileEvent) -> Result<bool> {
        Ok(false)
    }

    /// Periodic work. `Ok(true)` claims the pulse.
    fn on_pulse(&mut self, _now: DateTime<Utc>) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Command for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn triggers(&self) -> &[&'static str] {
            &["!echo", "!say"]
        }

        fn invoke(&mut self, _cmd: &str, _remainder: &str, _msg: &Message) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_default_handles_is_exact_membership() {
        let echo = Echo;
        assert!(echo.handles("!echo"));
        assert!(echo.handles("!say"));
        assert!(!echo.handles("!echoo"));
        assert!(!echo.handles(""));
    }

    #[test]
    fn test_default_capabilities_and_hooks() {
        let mut echo = Echo;
        assert_eq!(echo.capabilities(), Capabilities::chat_only());
        let file = FileEvent::new("f1", "a.png", "bob", 10);
        assert!(!echo.on_file(&file).unwrap());
        assert!(!echo.on_pulse(Utc::now()).unwrap());
    }

    #[test]
    fn test_capability_builders() {
        let caps = Capabilities::chat_only()
            .with_file()
            .with_pulse(Duration::from_secs(30));
        assert!(caps.file);
        assert_eq!(caps.pulse, Some(Duration::from_secs(30)));
    }
}
