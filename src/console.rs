//! Console transport: chat with the bot from a terminal.
//!
//! Input lines (stdin):
//!   `nick: text`            chat as `nick`
//!   `+nick: text`           chat as a logged-in `nick`
//!   `/upload name size [by]`  announce an upload
//!   `@room ...`             send the rest of the line to `room`
//!
//! `#room` tokens in chat become the message's room mentions. Everything
//! the bot posts or uploads is printed to stdout.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parrot_core::{FileEvent, Message, ParrotError, Result, Room};
use parrot_scheduler::ArbitratorHandle;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct ConsoleRoom {
    name: String,
    nick: String,
    connected: AtomicBool,
    uploads: AtomicU64,
}

impl ConsoleRoom {
    pub fn new(name: &str, nick: &str) -> Self {
        Self {
            name: name.to_string(),
            nick: nick.to_string(),
            connected: AtomicBool::new(true),
            uploads: AtomicU64::new(0),
        }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Room for ConsoleRoom {
    fn name(&self) -> &str {
        &self.name
    }

    fn bot_nick(&self) -> &str {
        &self.nick
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn post_chat(&self, text: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(ParrotError::Room(format!("#{} is closed", self.name)));
        }
        println!("[#{}] <{}> {text}", self.name, self.nick);
        Ok(())
    }

    fn upload_file(&self, data: Vec<u8>, name: &str) -> Result<String> {
        if !self.is_connected() {
            return Err(ParrotError::Room(format!("#{} is closed", self.name)));
        }
        let id = format!("{}-{}", self.name, self.uploads.fetch_add(1, Ordering::Relaxed) + 1);
        println!("[#{}] ⬆️ {name} ({} bytes) as @{id}", self.name, data.len());
        Ok(id)
    }
}

/// One parsed input line.
#[derive(Debug)]
pub enum ConsoleEvent {
    Chat(String, Message),
    File(String, FileEvent),
}

/// Parse a console line; `default_room` is used unless the line starts
/// with `@room`.
pub fn parse_line(line: &str, default_room: &str, seq: u64) -> Option<ConsoleEvent> {
    let line = line.trim();
    let (room, rest) = match line.strip_prefix('@') {
        Some(addressed) => {
            let (room, rest) = addressed.split_once(' ')?;
            (room.to_string(), rest.trim())
        }
        None => (default_room.to_string(), line),
    };

    if let Some(args) = rest.strip_prefix("/upload ") {
        let mut parts = args.split_whitespace();
        let name = parts.next()?;
        let size = parts.next()?.parse().ok()?;
        let uploader = parts.next().unwrap_or("console");
        let file = FileEvent::new(&format!("console-{seq}"), name, uploader, size);
        return Some(ConsoleEvent::File(room, file));
    }

    let (nick, text) = rest.split_once(':')?;
    let (nick, logged_in) = match nick.trim().strip_prefix('+') {
        Some(nick) => (nick, true),
        None => (nick.trim(), false),
    };
    if nick.is_empty() {
        return None;
    }
    let text = text.trim();
    let mut msg = Message::new(nick, text)
        .with_rooms(text.split_whitespace().filter(|w| w.len() > 1 && w.starts_with('#')));
    msg.logged_in = logged_in;
    Some(ConsoleEvent::Chat(room, msg))
}

/// Feed stdin into the arbitrator until EOF.
pub async fn pump_stdin(handle: ArbitratorHandle, default_room: String) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq = 0u64;
    while let Some(line) = lines.next_line().await? {
        seq += 1;
        match parse_line(&line, &default_room, seq) {
            Some(ConsoleEvent::Chat(room, msg)) => handle.chat(&room, msg),
            Some(ConsoleEvent::File(room, file)) => handle.file(&room, file),
            None if line.trim().is_empty() => {}
            None => eprintln!("?? expected `nick: text` or `/upload name size`"),
        }
    }
    tracing::info!("📪 stdin closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_mentions() {
        let Some(ConsoleEvent::Chat(room, msg)) = parse_line("+boss: !addroom #abc #def", "lobby", 1) else {
            panic!("expected chat");
        };
        assert_eq!(room, "lobby");
        assert_eq!(msg.nick, "boss");
        assert!(msg.logged_in);
        assert_eq!(msg.text, "!addroom #abc #def");
        assert_eq!(msg.rooms, vec!["#abc", "#def"]);
    }

    #[test]
    fn test_parse_addressed_upload() {
        let Some(ConsoleEvent::File(room, file)) = parse_line("@other /upload cat.png 2048 anon", "lobby", 7) else {
            panic!("expected file");
        };
        assert_eq!(room, "other");
        assert_eq!((file.name.as_str(), file.size, file.uploader.as_str()), ("cat.png", 2048, "anon"));
        assert_eq!(file.id, "console-7");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_line("no colon here", "lobby", 1).is_none());
        assert!(parse_line(": empty nick", "lobby", 1).is_none());
        assert!(parse_line("/upload cat.png lots", "lobby", 1).is_none());
    }

    #[test]
    fn test_console_room_upload_ids() {
        let room = ConsoleRoom::new("lobby", "parrot");
        assert_eq!(room.upload_file(b"x".to_vec(), "a.txt").unwrap(), "lobby-1");
        assert_eq!(room.upload_file(b"y".to_vec(), "b.txt").unwrap(), "lobby-2");
        room.disconnect();
        assert!(!room.is_connected());
        assert!(room.post_chat("hello?").is_err());
    }
}
