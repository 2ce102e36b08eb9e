//! Glue between the crawler, the probe and the arbitrator.
//!
//! Probes run on their own tokio tasks; their results come back through
//! [`ArbitratorHandle::call_later`] with zero delay, so every directory write
//! still happens on the arbitrator loop. A semaphore caps how many probe
//! processes run at once; the rest wait their turn.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use parrot_core::{ParrotError, Result};
use parrot_scheduler::ArbitratorHandle;
use tokio::sync::Semaphore;

use crate::crawler::{Crawler, RefreshOutcome};
use crate::probe::LivenessProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeKind {
    Mention,
    Refresh,
}

/// Shared discovery service. Cheap to clone; every room holds one.
#[derive(Clone)]
pub struct Discovery {
    crawler: Arc<Mutex<Crawler>>,
    probe: Arc<dyn LivenessProbe>,
    permits: Arc<Semaphore>,
}

impl Discovery {
    pub fn new(crawler: Crawler, probe: Arc<dyn LivenessProbe>) -> Self {
        let permits = Arc::new(Semaphore::new(crawler.settings().max_concurrent_probes.max(1)));
        Self {
            crawler: Arc::new(Mutex::new(crawler)),
            probe,
            permits,
        }
    }

    pub fn crawler(&self) -> Result<MutexGuard<'_, Crawler>> {
        self.crawler
            .lock()
            .map_err(|e| ParrotError::Store(format!("crawler lock poisoned: {e}")))
    }

    /// Probe every new room mentioned in `mentions`; the ones that turn out
    /// to exist are added later, on the loop. Returns how many probes started.
    pub fn add_rooms_from_mention(&self, arbitrator: &ArbitratorHandle, room: &str, mentions: &[String]) -> Result<usize> {
        let targets = self.crawler()?.rooms_to_probe(mentions, Utc::now())?;
        for target in &targets {
            self.spawn_probe(arbitrator, room, target, ProbeKind::Mention)?;
        }
        Ok(targets.len())
    }

    /// One crawler pulse: probe the next batch of known rooms.
    pub fn refresh(&self, arbitrator: &ArbitratorHandle, room: &str) -> Result<usize> {
        let batch = self.crawler()?.next_batch(Utc::now())?;
        if !batch.is_empty() {
            tracing::debug!("🔄 Refreshing {} rooms: {}", batch.len(), batch.join(", "));
        }
        for target in &batch {
            self.spawn_probe(arbitrator, room, target, ProbeKind::Refresh)?;
        }
        Ok(batch.len())
    }

    fn spawn_probe(&self, arbitrator: &ArbitratorHandle, room: &str, target: &str, kind: ProbeKind) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ParrotError::Scheduler(format!("cannot probe #{target}: {e}")))?;
        let probe = self.probe.clone();
        let permits = self.permits.clone();
        let crawler = self.crawler.clone();
        let arbitrator = arbitrator.clone();
        let room = room.to_string();
        let target = target.to_string();

        runtime.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let result = probe.probe(&target).await;
            arbitrator.call_later(&room, Duration::ZERO, move |_| {
                let mut crawler = crawler
                    .lock()
                    .map_err(|e| ParrotError::Store(format!("crawler lock poisoned: {e}")))?;
                match kind {
                    ProbeKind::Mention => {
                        crawler.apply_mention_probe(&target, &result, Utc::now())?;
                    }
                    ProbeKind::Refresh => {
                        let outcome = crawler.apply_refresh_probe(&target, &result)?;
                        if outcome != RefreshOutcome::Updated {
                            tracing::debug!("refresh of #{target}: {outcome:?}");
                        }
                    }
                }
                Ok(())
            });
        });
        Ok(())
    }
}
