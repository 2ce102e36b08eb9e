//! What every command instance gets to work with.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parrot_core::{BotState, Message, ParrotConfig, Result, Room};
use parrot_discovery::Discovery;
use parrot_scheduler::ArbitratorHandle;

/// Longest chat line the bot will post.
pub const MAX_POST_CHARS: usize = 300;

/// Per-room context handed to command factories. Cheap to clone.
#[derive(Clone)]
pub struct CommandContext {
    pub room: Arc<dyn Room>,
    pub admins: Arc<HashSet<String>>,
    pub state: BotState,
    pub arbitrator: ArbitratorHandle,
    pub config: Arc<ParrotConfig>,
    pub discovery: Discovery,
}

/// Cut `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl CommandContext {
    pub fn room_name(&self) -> &str {
        self.room.name()
    }

    /// Post a chat line, unless the bot has been muted with `.ded`.
    pub fn post(&self, text: &str) -> Result<()> {
        if !self.state.is_active() {
            tracing::debug!("muted, not posting: {text}");
            return Ok(());
        }
        self.room.post_chat(truncate(text, MAX_POST_CHARS))
    }

    /// Configured bot admin, and logged in so the nick can't be spoofed.
    pub fn is_admin(&self, msg: &Message) -> bool {
        msg.logged_in && self.admins.contains(&msg.nick)
    }

    /// Gate for the expensive commands when greens-only mode is on.
    pub fn allowed(&self, msg: &Message) -> bool {
        !self.state.greens_only() || msg.logged_in
    }

    /// Run `f` later on the arbitrator loop, in this room.
    pub fn call_later<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce(&Arc<dyn Room>) -> Result<()> + Send + 'static,
    {
        self.arbitrator.call_later(self.room.name(), delay, f);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by the command tests.

    use std::sync::Mutex;

    use async_trait::async_trait;
    use parrot_discovery::{Crawler, CrawlerSettings, LivenessProbe, ProbeError, ProbeResult, RoomDirectory};
    use parrot_scheduler::Arbitrator;

    use super::*;

    #[derive(Default)]
    pub struct FakeRoom {
        pub posts: Mutex<Vec<String>>,
        pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl FakeRoom {
        pub fn posts(&self) -> Vec<String> {
            self.posts.lock().unwrap().clone()
        }

        pub fn uploads(&self) -> Vec<String> {
            self.uploads.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    impl Room for FakeRoom {
        fn name(&self) -> &str {
            "home"
        }
        fn bot_nick(&self) -> &str {
            "parrot"
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn post_chat(&self, text: &str) -> Result<()> {
            self.posts.lock().unwrap().push(text.to_string());
            Ok(())
        }
        fn upload_file(&self, data: Vec<u8>, name: &str) -> Result<String> {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((name.to_string(), data));
            Ok(format!("file{}", uploads.len()))
        }
    }

    /// Every room is a 404.
    pub struct NoProbe;

    #[async_trait]
    impl LivenessProbe for NoProbe {
        async fn probe(&self, _room: &str) -> ProbeResult {
            Err(ProbeError::Remote {
                kind: "RuntimeError".into(),
                message: "404".into(),
            })
        }
    }

    pub struct Fixture {
        pub room: Arc<FakeRoom>,
        pub ctx: CommandContext,
        pub directory: Arc<RoomDirectory>,
        /// Keeps the arbitrator's inbox open; never run.
        pub _arbitrator: Arbitrator,
    }

    pub fn fixture() -> Fixture {
        fixture_with(ParrotConfig::default(), Arc::new(NoProbe))
    }

    pub fn fixture_with(config: ParrotConfig, probe: Arc<dyn LivenessProbe>) -> Fixture {
        let room = Arc::new(FakeRoom::default());
        let (arbitrator, handle) = Arbitrator::new();
        let directory = Arc::new(RoomDirectory::open_in_memory().unwrap());
        let crawler = Crawler::new(directory.clone(), CrawlerSettings::from(&config.discovery));
        let ctx = CommandContext {
            room: room.clone(),
            admins: Arc::new(["boss".to_string()].into()),
            state: BotState::new(true, false, false),
            arbitrator: handle,
            config: Arc::new(config),
            discovery: Discovery::new(crawler, probe),
        };
        Fixture {
            room,
            ctx,
            directory,
            _arbitrator: arbitrator,
        }
    }

    pub fn admin(text: &str) -> Message {
        Message::new("boss", text).logged_in()
    }
}
