//! Events delivered by the transport.

use serde::{Deserialize, Serialize};

/// A chat line as seen by the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub nick: String,
    pub text: String,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub staff: bool,
    /// Ids of files referenced in the message.
    #[serde(default)]
    pub files: Vec<String>,
    /// Rooms referenced in the message, as written (`#abc` or `abc`).
    #[serde(default)]
    pub rooms: Vec<String>,
}

impl Message {
    pub fn new(nick: &str, text: &str) -> Self {
        Self {
            nick: nick.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn logged_in(mut self) -> Self {
        self.logged_in = true;
        self
    }

    pub fn with_rooms<I, S>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rooms = rooms.into_iter().map(Into::into).collect();
        self
    }
}

/// A file that appeared in the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvent {
    pub id: String,
    pub name: String,
    pub uploader: String,
    pub size: u64,
}

impl FileEvent {
    pub fn new(id: &str, name: &str, uploader: &str, size: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            uploader: uploader.to_string(),
            size,
        }
    }
}
