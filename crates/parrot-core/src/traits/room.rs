//! Room trait: the transport boundary.

use crate::error::Result;

/// A joined chat room.
///
/// Outbound calls only enqueue; implementations must not block the caller
/// on network I/O.
pub trait Room: Send + Sync {
    /// Room id as used on the wire.
    fn name(&self) -> &str;

    /// Nick the bot is using in this room.
    fn bot_nick(&self) -> &str;

    /// Whether the session is currently connected.
    fn is_connected(&self) -> bool;

    /// Post a chat line.
    fn post_chat(&self, text: &str) -> Result<()>;

    /// Upload a file, returning its id.
    fn upload_file(&self, data: Vec<u8>, name: &str) -> Result<String>;
}
