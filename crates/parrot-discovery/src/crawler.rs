//! Discovery crawler state machine.
//!
//! Pure bookkeeping over the [`RoomDirectory`]: which rooms to probe next and
//! what a probe result does to a row. Running the probes and getting their
//! results back onto the arbitrator loop is [`crate::service`]'s job.
//!
//! ```text
//!            mention ──probe ok──► Alive ◄──────────────┐
//!                                    │ refresh probe     │ ok
//!                         ┌──────────┼─────────────┐     │
//!                   disabled/404   transient      ok ────┘
//!                         ▼          ▼
//!                    Dead/deleted  Unknown ── refresh probe ──► (same edges)
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parrot_core::Result;
use parrot_core::config::DiscoveryConfig;

use crate::probe::{ProbeResult, classify};
use crate::ranking::{RankOverrides, rank};
use crate::store::{AliveState, RoomDirectory, RoomRecord};

/// How long a mention probe may stay unanswered before the room can be
/// probed again. Covers results dropped because the room went away.
const IN_FLIGHT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct CrawlerSettings {
    pub batch_size: usize,
    pub max_concurrent_probes: usize,
    pub throttle: Duration,
    pub purge_dead: bool,
    pub ignore_rooms: HashSet<String>,
    pub overrides: RankOverrides,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for CrawlerSettings {
    fn from(config: &DiscoveryConfig) -> Self {
        let ids = |list: &[String]| -> HashSet<String> {
            list.iter().filter_map(|r| normalize_room(r)).collect()
        };
        Self {
            batch_size: config.batch_size.max(1),
            max_concurrent_probes: config.max_concurrent_probes.max(1),
            throttle: Duration::from_secs(config.refresh_throttle_secs),
            purge_dead: config.purge_dead,
            ignore_rooms: ids(&config.ignore_rooms),
            overrides: RankOverrides {
                first: ids(&config.pinned_first),
                last: ids(&config.pinned_last),
            },
        }
    }
}

/// What a refresh probe did to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    Migrated { to: String },
    Unknown,
    MarkedDead,
    Removed,
    /// The row disappeared while the probe was running.
    Gone,
}

/// `#abc` / ` abc ` → `abc`.
pub fn normalize_room(raw: &str) -> Option<String> {
    let room = raw.trim().trim_start_matches('#').trim();
    (!room.is_empty()).then(|| room.to_string())
}

pub struct Crawler {
    directory: Arc<RoomDirectory>,
    settings: CrawlerSettings,
    queue: VecDeque<String>,
    last_refresh: Option<DateTime<Utc>>,
    in_flight: HashMap<String, DateTime<Utc>>,
    /// Bumped on every directory change; listing caches key off it.
    revision: u64,
}

impl Crawler {
    pub fn new(directory: Arc<RoomDirectory>, settings: CrawlerSettings) -> Self {
        Self {
            directory,
            settings,
            queue: VecDeque::new(),
            last_refresh: None,
            in_flight: HashMap::new(),
            revision: 0,
        }
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.directory
    }

    pub fn settings(&self) -> &CrawlerSettings {
        &self.settings
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Rooms from a message worth probing. The returned rooms are marked
    /// in flight until [`Crawler::apply_mention_probe`] sees them.
    pub fn rooms_to_probe(&mut self, mentions: &[String], now: DateTime<Utc>) -> Result<Vec<String>> {
        let ttl = chrono::Duration::from_std(IN_FLIGHT_TTL).unwrap_or_default();
        self.in_flight.retain(|_, since| now < *since + ttl);

        let mut rooms = Vec::new();
        for mention in mentions {
            let Some(room) = normalize_room(mention) else {
                continue;
            };
            if rooms.contains(&room)
                || self.settings.ignore_rooms.contains(&room)
                || self.in_flight.contains_key(&room)
                || self.directory.contains(&room)?
            {
                continue;
            }
            self.in_flight.insert(room.clone(), now);
            rooms.push(room);
        }
        Ok(rooms)
    }

    /// Record the result of probing a freshly mentioned room. Returns
    /// whether a row was added.
    pub fn apply_mention_probe(&mut self, requested: &str, result: &ProbeResult, now: DateTime<Utc>) -> Result<bool> {
        self.in_flight.remove(requested);

        let report = match result {
            Ok(report) if !report.disabled => report,
            Ok(_) => {
                tracing::debug!("🔎 {requested} is disabled, not adding");
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!("⚠️ Probe of mentioned room {requested} failed: {e}");
                return Ok(false);
            }
        };

        let room = report.canonical_id(requested);
        if self.settings.ignore_rooms.contains(room) {
            return Ok(false);
        }
        let record = RoomRecord::new(room, &report.stats(), now.timestamp_millis());
        let added = self.directory.upsert_if_absent(&record)?;
        if added {
            tracing::info!("🗺️ Discovered #{room} ({}/{}) {}", record.users, record.files, record.title);
            self.revision += 1;
        }
        Ok(added)
    }

    /// Rooms to refresh on this pulse. Empty while inside the throttle
    /// window since the last refresh.
    pub fn next_batch(&mut self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let throttle = chrono::Duration::from_std(self.settings.throttle).unwrap_or_default();
        if let Some(last) = self.last_refresh
            && now < last + throttle
        {
            return Ok(Vec::new());
        }
        self.last_refresh = Some(now);

        if self.queue.is_empty() {
            self.queue.extend(self.directory.refresh_candidates()?);
            tracing::debug!("🔄 Refresh queue refilled with {} rooms", self.queue.len());
        }
        let take = self.settings.batch_size.min(self.queue.len());
        Ok(self.queue.drain(..take).collect())
    }

    /// Apply a refresh probe result to the row for `room`.
    pub fn apply_refresh_probe(&mut self, room: &str, result: &ProbeResult) -> Result<RefreshOutcome> {
        if !self.directory.contains(room)? {
            return Ok(RefreshOutcome::Gone);
        }

        let outcome = match (classify(result), result) {
            (AliveState::Alive, Ok(report)) => {
                let canonical = report.canonical_id(room);
                if canonical != room {
                    self.directory.migrate_canonical(room, canonical, &report.stats())?;
                    tracing::info!("🔀 #{room} is now #{canonical}");
                    RefreshOutcome::Migrated {
                        to: canonical.to_string(),
                    }
                } else {
                    self.directory.update_stats(room, &report.stats())?;
                    RefreshOutcome::Updated
                }
            }
            (AliveState::Dead, _) => {
                if self.settings.purge_dead {
                    self.directory.delete(room)?;
                    tracing::info!("🪦 #{room} is gone, removed");
                    RefreshOutcome::Removed
                } else {
                    self.directory.mark_dead(room)?;
                    tracing::info!("🪦 #{room} is gone, marked dead");
                    RefreshOutcome::MarkedDead
                }
            }
            _ => {
                if let Err(e) = result {
                    tracing::debug!("probe of #{room} failed, keeping it: {e}");
                }
                self.directory.mark_unknown(room)?;
                RefreshOutcome::Unknown
            }
        };
        self.revision += 1;
        Ok(outcome)
    }

    /// Alive rooms in ranked order.
    pub fn listing(&self, exclude: Option<&str>, title_filter: Option<&str>) -> Result<Vec<RoomRecord>> {
        let rooms = self.directory.list_alive(exclude, title_filter)?;
        Ok(rank(rooms, &self.settings.overrides))
    }

    /// Operator removal. Returns whether the room existed.
    pub fn delete_room(&mut self, room: &str) -> Result<bool> {
        let deleted = self.directory.delete(room)?;
        if deleted {
            self.revision += 1;
            self.queue.retain(|r| r != room);
        }
        Ok(deleted)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
