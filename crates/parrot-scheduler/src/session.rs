//! What the arbitrator drives for each attached room.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parrot_core::{FileEvent, Message, Room};

/// A room attached to the arbitrator.
///
/// All methods run on the arbitrator task, one at a time.
pub trait RoomSession: Send {
    fn room(&self) -> &Arc<dyn Room>;

    fn on_message(&mut self, msg: &Message, now: DateTime<Utc>);

    fn on_file(&mut self, file: &FileEvent);

    fn on_pulse(&mut self, now: DateTime<Utc>);
}
