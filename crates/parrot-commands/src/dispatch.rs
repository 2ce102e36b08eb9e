//! Per-room dispatcher.
//!
//! Runs on the arbitrator loop. Chat, file and pulse events walk the
//! registry's lists in order; the first command that claims an event ends
//! the walk. Command errors and panics are logged and count as "not
//! claimed".

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parrot_core::config::ModerationConfig;
use parrot_core::guard::isolate;
use parrot_core::{FileEvent, Message, RateLimitCache, Room};
use parrot_scheduler::RoomSession;

use crate::registry::CommandRegistry;

/// How long a watchlisted nick waits between claimed commands.
pub const WATCHLIST_COOLDOWN: Duration = Duration::from_secs(600);
const WATCHLIST_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    Blacklisted,
    Cooldown,
    NoCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Unclaimed,
    Claimed(String),
}

/// `"!Foo  bar baz "` → `("!foo", "bar baz")`.
pub fn split_command(text: &str) -> (String, &str) {
    let (cmd, remainder) = text.split_once(' ').unwrap_or((text, ""));
    (cmd.trim().to_lowercase(), remainder.trim())
}

pub struct Dispatcher {
    room: Arc<dyn Room>,
    registry: CommandRegistry,
    blacklist: Vec<String>,
    watchlist: Vec<String>,
    watch_cooldown: RateLimitCache,
}

fn folded(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Dispatcher {
    pub fn new(room: Arc<dyn Room>, registry: CommandRegistry, moderation: &ModerationConfig) -> Self {
        Self {
            room,
            registry,
            blacklist: folded(&moderation.blacklist),
            watchlist: folded(&moderation.watchlist),
            watch_cooldown: RateLimitCache::new(WATCHLIST_CAPACITY, WATCHLIST_COOLDOWN),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn dispatch_message(&mut self, msg: &Message, now: DateTime<Utc>) -> DispatchOutcome {
        if msg.nick == self.room.bot_nick() {
            return DispatchOutcome::Ignored(IgnoreReason::OwnMessage);
        }

        let nick = msg.nick.to_lowercase();
        if self.blacklist.iter().any(|b| nick.contains(b.as_str())) {
            return DispatchOutcome::Ignored(IgnoreReason::Blacklisted);
        }
        let watched = self.watchlist.iter().any(|w| nick.contains(w.as_str()));
        if watched && self.watch_cooldown.is_cooling(&nick, now) {
            return DispatchOutcome::Ignored(IgnoreReason::Cooldown);
        }

        let (cmd, remainder) = split_command(&msg.text);
        if cmd.is_empty() {
            return DispatchOutcome::Ignored(IgnoreReason::NoCommand);
        }

        let registry = &mut self.registry;
        for &i in &registry.chat {
            let command = &mut registry.commands[i];
            if !command.handles(&cmd) {
                continue;
            }
            let name = command.name().to_string();
            if isolate("invoke", &name, || command.invoke(&cmd, remainder, msg)) == Some(true) {
                if watched {
                    self.watch_cooldown.touch(&nick, now);
                }
                return DispatchOutcome::Claimed(name);
            }
        }
        DispatchOutcome::Unclaimed
    }

    pub fn dispatch_file(&mut self, file: &FileEvent) -> DispatchOutcome {
        let registry = &mut self.registry;
        for &i in &registry.file {
            let command = &mut registry.commands[i];
            let name = command.name().to_string();
            if isolate("file", &name, || command.on_file(file)) == Some(true) {
                return DispatchOutcome::Claimed(name);
            }
        }
        DispatchOutcome::Unclaimed
    }

    pub fn dispatch_pulse(&mut self, now: DateTime<Utc>) -> DispatchOutcome {
        let registry = &mut self.registry;
        for (i, gate) in registry.pulse.iter_mut() {
            if !gate.check(now) {
                continue;
            }
            let command = &mut registry.commands[*i];
            let name = command.name().to_string();
            if isolate("pulse", &name, || command.on_pulse(now)) == Some(true) {
                return DispatchOutcome::Claimed(name);
            }
        }
        DispatchOutcome::Unclaimed
    }
}

impl RoomSession for Dispatcher {
    fn room(&self) -> &Arc<dyn Room> {
        &self.room
    }

    fn on_message(&mut self, msg: &Message, now: DateTime<Utc>) {
        let outcome = self.dispatch_message(msg, now);
        tracing::debug!("💬 <{}> {} → {outcome:?}", msg.nick, msg.text);
    }

    fn on_file(&mut self, file: &FileEvent) {
        let outcome = self.dispatch_file(file);
        tracing::debug!("📁 {} by {} → {outcome:?}", file.name, file.uploader);
    }

    fn on_pulse(&mut self, now: DateTime<Utc>) {
        if let DispatchOutcome::Claimed(name) = self.dispatch_pulse(now) {
            tracing::debug!("💓 pulse claimed by {name}");
        }
    }
}
