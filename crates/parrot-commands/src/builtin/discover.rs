//! Room discovery commands.
//!
//! | trigger          | who        | what                                          |
//! |------------------|------------|-----------------------------------------------|
//! | `!addroom #a #b` | allowed    | probe and add the mentioned rooms             |
//! | `!delroom #a`    | admin      | drop a room from the directory                |
//! | `!discover [n]`  | allowed    | ranked listing, addressed to `n` or sender    |
//! | `!room <word>`   | allowed    | listing filtered by title                     |
//! | `!fulldiscover`  | allowed    | upload the whole directory as `rooms.txt`     |
//! | anything         | everyone   | rooms mentioned in chat are harvested         |

use std::time::Duration;

use parrot_core::{Capabilities, Command, Message, Result};
use parrot_discovery::{format_listing, format_table, normalize_room};

use crate::context::CommandContext;

pub struct AddRoomCommand {
    ctx: CommandContext,
}

impl AddRoomCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }
}

impl Command for AddRoomCommand {
    fn name(&self) -> &str {
        "addroom"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!addroom"]
    }

    fn invoke(&mut self, _cmd: &str, _remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.allowed(msg) {
            self.ctx.post(&format!("{}: No rooms for you", msg.nick))?;
            return Ok(true);
        }
        let started = self.ctx.discovery.add_rooms_from_mention(
            &self.ctx.arbitrator,
            self.ctx.room_name(),
            &msg.rooms,
        )?;
        if started > 0 {
            self.ctx.post(&format!("{}: Checking {started} room(s)", msg.nick))?;
        } else if !msg.rooms.is_empty() {
            self.ctx.post(&format!("{}: Nothing new there", msg.nick))?;
        }
        Ok(true)
    }
}

pub struct DelRoomCommand {
    ctx: CommandContext,
}

impl DelRoomCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }
}

impl Command for DelRoomCommand {
    fn name(&self) -> &str {
        "delroom"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!delroom"]
    }

    fn invoke(&mut self, _cmd: &str, _remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.is_admin(msg) {
            self.ctx.post(&format!("{}: No rooms for you", msg.nick))?;
            return Ok(true);
        }
        let [mention] = msg.rooms.as_slice() else {
            tracing::warn!("⚠️ !delroom needs exactly one room, got {}", msg.rooms.len());
            return Ok(true);
        };
        let Some(room) = normalize_room(mention) else {
            return Ok(true);
        };

        self.ctx.discovery.crawler()?.delete_room(&room)?;
        tracing::info!("🗑️ {} deleted #{room}", msg.nick);
        self.ctx.post(&format!("{}: Nuked that room", msg.nick))?;
        Ok(true)
    }
}

/// `!discover` and `!room`: one-line ranked listings.
pub struct DiscoverCommand {
    ctx: CommandContext,
}

impl DiscoverCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }
}

impl Command for DiscoverCommand {
    fn name(&self) -> &str {
        "discover"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!discover", "!room"]
    }

    fn invoke(&mut self, cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        let (nick, filter) = if cmd == "!room" {
            if remainder.is_empty() {
                return Ok(false);
            }
            (msg.nick.as_str(), Some(remainder))
        } else if remainder.is_empty() {
            (msg.nick.as_str(), None)
        } else {
            (remainder, None)
        };

        if !self.ctx.allowed(msg) {
            self.ctx.post(&format!(
                "{}, clean up your own room first before you can haz more rooms!",
                msg.nick
            ))?;
            return Ok(true);
        }

        let rooms = self
            .ctx
            .discovery
            .crawler()?
            .listing(Some(self.ctx.room_name()), filter)?;
        let budget = self
            .ctx
            .config
            .discovery
            .listing_budget
            .saturating_sub(nick.chars().count());
        self.ctx.post(&format!("{nick}: {}", format_listing(&rooms, budget)))?;
        Ok(true)
    }
}

/// `!fulldiscover [nick] [all]`: the whole directory as a file, addressed
/// to `nick` (default: the sender).
pub struct FullDiscoverCommand {
    ctx: CommandContext,
    /// (crawler revision, file id) of the last default upload in this room.
    cached: Option<(u64, String)>,
}

impl FullDiscoverCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self {
            ctx: ctx.clone(),
            cached: None,
        }))
    }
}

impl Command for FullDiscoverCommand {
    fn name(&self) -> &str {
        "fulldiscover"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!fulldiscover"]
    }

    fn invoke(&mut self, _cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.allowed(msg) {
            return Ok(true);
        }
        let mut include_empty = false;
        let mut addressee: Option<&str> = None;
        for word in remainder.split_whitespace() {
            if word.eq_ignore_ascii_case("all") {
                include_empty = true;
            } else if addressee.is_none() {
                addressee = Some(word);
            }
        }
        let addressee = addressee.unwrap_or(msg.nick.as_str());

        let (revision, rooms) = {
            let crawler = self.ctx.discovery.crawler()?;
            (crawler.revision(), crawler.listing(Some(self.ctx.room_name()), None)?)
        };

        let id = match &self.cached {
            Some((rev, id)) if *rev == revision && !include_empty => id.clone(),
            _ => {
                if !self.ctx.state.is_active() {
                    return Ok(true);
                }
                let table = format_table(&rooms, include_empty);
                let id = self.ctx.room.upload_file(table.into_bytes(), "rooms.txt")?;
                if !include_empty {
                    self.cached = Some((revision, id.clone()));
                }
                id
            }
        };
        self.ctx.post(&format!("{addressee}: @{id}"))?;
        Ok(true)
    }
}

/// Harvests room mentions from every message and drives the periodic
/// refresh. Never claims chat.
pub struct RoomCrawlerCommand {
    ctx: CommandContext,
    ignore_nicks: Vec<String>,
    interval: Duration,
}

impl RoomCrawlerCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        let config = &ctx.config.discovery;
        Ok(Box::new(Self {
            ctx: ctx.clone(),
            ignore_nicks: config.ignore_nicks.iter().map(|n| n.to_lowercase()).collect(),
            interval: Duration::from_secs(config.pulse_interval_secs),
        }))
    }
}

impl Command for RoomCrawlerCommand {
    fn name(&self) -> &str {
        "crawler"
    }

    fn handles(&self, _cmd: &str) -> bool {
        true
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::chat_only().with_pulse(self.interval)
    }

    fn invoke(&mut self, _cmd: &str, _remainder: &str, msg: &Message) -> Result<bool> {
        if msg.rooms.is_empty() || self.ignore_nicks.contains(&msg.nick.to_lowercase()) {
            return Ok(false);
        }
        self.ctx.discovery.add_rooms_from_mention(
            &self.ctx.arbitrator,
            self.ctx.room_name(),
            &msg.rooms,
        )?;
        Ok(false)
    }

    fn on_pulse(&mut self, _now: chrono::DateTime<chrono::Utc>) -> Result<bool> {
        let started = self
            .ctx
            .discovery
            .refresh(&self.ctx.arbitrator, self.ctx.room_name())?;
        Ok(started > 0)
    }
}
