//! # Parrot Scheduler
//!
//! The arbitrator: one cooperative tokio task that serializes everything a
//! room does: chat dispatch, file dispatch, deferred calls and pulses.
//!
//! ## Architecture
//! ```text
//! transport / worker tasks ──► ArbitratorHandle (mpsc, any thread)
//!                                   │
//!                                   ▼
//! Arbitrator loop ── inbox ──► RoomSession::on_message / on_file
//!        │
//!        └── timer heap (fire_at, seq)
//!              ├── DeferredCall → callback(room)   (skipped if room gone/offline)
//!              └── Pulse        → RoomSession::on_pulse, re-armed every interval
//! ```

pub mod arbitrator;
pub mod pulse;
pub mod session;

pub use arbitrator::{Arbitrator, ArbitratorHandle, Callback};
pub use pulse::PulseGate;
pub use session::RoomSession;
