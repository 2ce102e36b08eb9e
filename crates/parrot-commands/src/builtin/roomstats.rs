//! `.roomstats` / `.stats [nick]`: upload statistics for files seen since
//! the bot joined.

use std::collections::HashMap;

use parrot_core::{Capabilities, Command, FileEvent, Message, Result};

use crate::context::CommandContext;

/// `1536` → `"1.5KiB"`.
pub fn to_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"] {
        if num < 900.0 {
            return format!("{num:.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}ZiB")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    files: u64,
    bytes: u64,
}

impl Tally {
    fn add(&mut self, size: u64) {
        self.files += 1;
        self.bytes += size;
    }
}

pub struct RoomStatsCommand {
    ctx: CommandContext,
    total: Tally,
    /// Keyed by case-folded uploader; keeps the last spelling seen.
    uploaders: HashMap<String, (String, Tally)>,
}

impl RoomStatsCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self::new(ctx)))
    }

    fn new(ctx: &CommandContext) -> Self {
        Self {
            ctx: ctx.clone(),
            total: Tally::default(),
            uploaders: HashMap::new(),
        }
    }

    fn room_summary(&self) -> String {
        if self.total.files == 0 {
            return "No files seen yet".to_string();
        }
        let mut line = format!(
            "{} files, {} total from {} uploaders",
            self.total.files,
            to_size(self.total.bytes),
            self.uploaders.len()
        );
        let top = self
            .uploaders
            .values()
            .max_by(|a, b| a.1.bytes.cmp(&b.1.bytes).then_with(|| b.0.cmp(&a.0)));
        if let Some((nick, tally)) = top {
            line.push_str(&format!(
                ", top: {nick} ({} files, {})",
                tally.files,
                to_size(tally.bytes)
            ));
        }
        line
    }

    fn user_summary(&self, nick: &str) -> String {
        match self.uploaders.get(&nick.to_lowercase()) {
            Some((name, tally)) => format!(
                "{name} uploaded {} files, {} ({:.1}% of the room)",
                tally.files,
                to_size(tally.bytes),
                100.0 * tally.bytes as f64 / self.total.bytes.max(1) as f64
            ),
            None => format!("{nick} didn't upload anything"),
        }
    }
}

impl Command for RoomStatsCommand {
    fn name(&self) -> &str {
        "roomstats"
    }

    fn triggers(&self) -> &[&'static str] {
        &[".roomstats", ".stats"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::chat_only().with_file()
    }

    fn invoke(&mut self, cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        let line = if cmd == ".stats" {
            let nick = remainder.split_whitespace().next().unwrap_or(&msg.nick);
            self.user_summary(nick)
        } else {
            self.room_summary()
        };
        self.ctx.post(&line)?;
        Ok(true)
    }

    /// Counts the upload but never claims it.
    fn on_file(&mut self, file: &FileEvent) -> Result<bool> {
        self.total.add(file.size);
        let entry = self
            .uploaders
            .entry(file.uploader.to_lowercase())
            .or_insert_with(|| (file.uploader.clone(), Tally::default()));
        entry.0 = file.uploader.clone();
        entry.1.add(file.size);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::fixture;

    #[test]
    fn test_to_size() {
        assert_eq!(to_size(0), "0.0B");
        assert_eq!(to_size(899), "899.0B");
        assert_eq!(to_size(1536), "1.5KiB");
        assert_eq!(to_size(5 * 1024 * 1024), "5.0MiB");
    }

    #[test]
    fn test_room_and_user_stats() {
        let f = fixture();
        let mut cmd = RoomStatsCommand::new(&f.ctx);
        assert!(cmd.invoke(".roomstats", "", &Message::new("anon", ".roomstats")).unwrap());

        for (uploader, size) in [("Alice", 1024), ("bob", 100), ("alice", 1024)] {
            assert!(!cmd.on_file(&FileEvent::new("id", "f.bin", uploader, size)).unwrap());
        }
        cmd.invoke(".roomstats", "", &Message::new("anon", ".roomstats")).unwrap();
        cmd.invoke(".stats", "", &Message::new("bob", ".stats")).unwrap();
        cmd.invoke(".stats", "carol", &Message::new("bob", ".stats carol")).unwrap();

        assert_eq!(
            f.room.posts(),
            vec![
                "No files seen yet",
                "3 files, 2.1KiB total from 2 uploaders, top: alice (2 files, 2.0KiB)",
                "bob uploaded 1 files, 100.0B (4.7% of the room)",
                "carol didn't upload anything",
            ]
        );
    }
}
