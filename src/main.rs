//! # Parrot: chat-room bot
//!
//! Runs the dispatcher, the arbitrator and the discovery crawler against a
//! console transport.
//!
//! Usage:
//!   parrot                               # One console room, "lobby"
//!   parrot lobby music                   # Several rooms; `@music nick: hi` addresses one
//!   parrot --rooms seed.txt --admins me  # Seed the room directory on startup
//!   parrot --ded --debug                 # Start muted, verbose logs

mod console;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parrot_commands::builtin::catalogue;
use parrot_commands::{CommandContext, CommandRegistry, Dispatcher};
use parrot_core::{BotState, Message, ParrotConfig};
use parrot_discovery::{Crawler, CrawlerSettings, Discovery, ProcessProbe, RoomDirectory};
use parrot_scheduler::Arbitrator;
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleRoom;

#[derive(Parser)]
#[command(name = "parrot", version, about = "🦜 Parrot: chat-room bot")]
struct Cli {
    /// Rooms to join
    #[arg(default_value = "lobby")]
    rooms: Vec<String>,

    /// Config file (default: ~/.parrot/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Bot nick
    #[arg(long)]
    nick: Option<String>,

    /// Admin nicks, comma separated
    #[arg(long, value_delimiter = ',')]
    admins: Vec<String>,

    /// Start muted until an admin says `.active`
    #[arg(long)]
    ded: bool,

    /// Answer things nobody asked
    #[arg(long)]
    shitposting: bool,

    /// Only logged-in users may use the expensive commands
    #[arg(long)]
    greenmasterrace: bool,

    /// Disable canned-phrase commands
    #[arg(long)]
    no_parrot: bool,

    /// Enable commands that upload files
    #[arg(long)]
    uploads: bool,

    /// Seed file: one room per line (`room [anything]`)
    #[arg(long = "rooms", value_name = "FILE")]
    seed: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    /// CLI flags win over the config file.
    fn apply(&self, config: &mut ParrotConfig) {
        if let Some(nick) = &self.nick {
            config.bot.nick = nick.clone();
        }
        for admin in &self.admins {
            if !config.bot.admins.contains(admin) {
                config.bot.admins.push(admin.clone());
            }
        }
        config.bot.start_dead |= self.ded;
        config.bot.shitposting |= self.shitposting;
        config.bot.greens_only |= self.greenmasterrace;
        if self.no_parrot {
            config.features.phrases = false;
        }
        config.features.uploads |= self.uploads;
    }
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// First word of every non-empty line.
fn read_seed(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let mut rooms: Vec<String> = Vec::new();
    for line in content.lines() {
        if let Some(room) = line.split_whitespace().next()
            && !rooms.iter().any(|r| r == room)
        {
            rooms.push(room.to_string());
        }
    }
    Ok(rooms)
}

/// A synthetic `!addroom` from an admin, dispatched like any other message.
fn seed_message(config: &ParrotConfig, rooms: &[String]) -> Message {
    let nick = config.bot.admins.first().map(String::as_str).unwrap_or("operator");
    Message::new(nick, "!addroom").logged_in().with_rooms(rooms.iter().cloned())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "parrot=debug,parrot_core=debug,parrot_scheduler=debug,parrot_discovery=debug,parrot_commands=debug"
    } else {
        "parrot=info,parrot_core=info,parrot_scheduler=info,parrot_discovery=info,parrot_commands=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => ParrotConfig::load_from(&expand_path(path))?,
        None => ParrotConfig::load()?,
    };
    cli.apply(&mut config);
    let config = Arc::new(config);

    // Discovery
    let db_path = config.discovery.resolved_db_path();
    let directory = Arc::new(RoomDirectory::open(&db_path)?);
    tracing::info!("🗺️ Room directory: {} ({} rooms)", db_path.display(), directory.count()?);
    let crawler = Crawler::new(directory, CrawlerSettings::from(&config.discovery));
    let probe = Arc::new(ProcessProbe::from_config(&config.discovery)?);
    let discovery = Discovery::new(crawler, probe);

    let state = BotState::new(
        !config.bot.start_dead,
        config.bot.shitposting,
        config.bot.greens_only,
    );
    let admins: Arc<HashSet<String>> = Arc::new(config.bot.admins.iter().cloned().collect());
    let seed = match &cli.seed {
        Some(path) => read_seed(&expand_path(path))?,
        None => Vec::new(),
    };

    let (arbitrator, handle) = Arbitrator::new();
    let loop_task = tokio::spawn(arbitrator.run());

    let mut rooms: HashMap<String, Arc<ConsoleRoom>> = HashMap::new();
    for (i, name) in cli.rooms.iter().enumerate() {
        let room = Arc::new(ConsoleRoom::new(name, &config.bot.nick));
        let ctx = CommandContext {
            room: room.clone(),
            admins: admins.clone(),
            state: state.clone(),
            arbitrator: handle.clone(),
            config: config.clone(),
            discovery: discovery.clone(),
        };
        let registry = CommandRegistry::build(&catalogue(), &ctx, &config.features);
        let pulse = registry.min_pulse_interval();
        handle.attach(Box::new(Dispatcher::new(room.clone(), registry, &config.moderation)));

        // The directory is shared, so one room's worth of seeding is enough.
        if i == 0 && !seed.is_empty() {
            tracing::info!("🌱 Seeding {} rooms via #{name}", seed.len());
            handle.chat(name, seed_message(&config, &seed));
        }
        if let Some(interval) = pulse {
            handle.start_pulse(name, interval);
            tracing::info!("💓 #{name} pulse every {interval:?}");
        }
        rooms.insert(name.clone(), room);
    }

    tracing::info!("🦜 {} listening in {} room(s)", config.bot.nick, rooms.len());
    let default_room = cli.rooms.first().cloned().unwrap_or_else(|| "lobby".into());
    tokio::select! {
        result = console::pump_stdin(handle.clone(), default_room) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("🛑 Interrupted"),
    }

    for (name, room) in &rooms {
        room.disconnect();
        handle.detach(name);
    }
    handle.shutdown();
    loop_task.await?;
    tracing::info!("👋 bot done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["parrot", "--admins", "a,b", "--ded", "--no-parrot", "--nick", "polly", "r1", "r2"]);
        let mut config = ParrotConfig::default();
        config.bot.admins = vec!["a".into()];
        cli.apply(&mut config);

        assert_eq!(cli.rooms, vec!["r1", "r2"]);
        assert_eq!(config.bot.nick, "polly");
        assert_eq!(config.bot.admins, vec!["a", "b"]);
        assert!(config.bot.start_dead);
        assert!(!config.features.phrases);
        assert!(!config.features.uploads);
    }

    #[test]
    fn test_default_room() {
        let cli = Cli::parse_from(["parrot"]);
        assert_eq!(cli.rooms, vec!["lobby"]);
    }

    #[test]
    fn test_read_seed() {
        let dir = std::env::temp_dir().join("parrot-test-seed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rooms.txt");
        std::fs::write(&path, "abc some title\n\ndef\nabc again\n").unwrap();

        assert_eq!(read_seed(&path).unwrap(), vec!["abc", "def"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_seed_message_comes_from_an_admin() {
        let mut config = ParrotConfig::default();
        config.bot.admins = vec!["boss".into()];
        let msg = seed_message(&config, &["abc".to_string()]);
        assert_eq!(msg.nick, "boss");
        assert!(msg.logged_in);
        assert_eq!(msg.text, "!addroom");
        assert_eq!(msg.rooms, vec!["abc"]);
    }
}
