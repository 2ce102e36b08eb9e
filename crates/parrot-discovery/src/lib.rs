//! # Parrot Discovery
//!
//! Keeps a persistent directory of rooms the bot has heard about and how
//! busy they are.
//!
//! - [`store::RoomDirectory`]: SQLite table of rooms
//! - [`probe::ProcessProbe`]: out-of-process liveness checks with a hard timeout
//! - [`crawler::Crawler`]: what to probe next and what results mean
//! - [`ranking`]: scoring and rendering of listings
//! - [`service::Discovery`]: runs probes off the arbitrator loop and applies
//!   their results back on it

pub mod crawler;
pub mod probe;
pub mod ranking;
pub mod service;
pub mod store;

pub use crawler::{Crawler, CrawlerSettings, RefreshOutcome, normalize_room};
pub use probe::{LivenessProbe, ProbeError, ProbeReport, ProbeResult, ProcessProbe, classify};
pub use ranking::{RankOverrides, format_listing, format_table, rank, score};
pub use service::Discovery;
pub use store::{AliveState, RoomDirectory, RoomRecord, RoomStats};
