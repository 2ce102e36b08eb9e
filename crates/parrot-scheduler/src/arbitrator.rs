//! Arbitrator: the single execution context of the bot.
//!
//! One tokio task owns every attached room session and a heap of timers.
//! Other tasks and threads talk to it only through [`ArbitratorHandle`],
//! which marshals requests over an unbounded channel. Nothing that runs on
//! the loop may block: slow work is pushed to worker tasks that report back
//! with [`ArbitratorHandle::call_later`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parrot_core::guard::isolate;
use parrot_core::{FileEvent, Message, Result, Room};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::session::RoomSession;

/// A one-shot callback, run on the loop with the room it was scheduled for.
pub type Callback = Box<dyn FnOnce(&Arc<dyn Room>) -> Result<()> + Send + 'static>;

enum Request {
    Attach(Box<dyn RoomSession>),
    Detach(String),
    Chat(String, Message),
    File(String, FileEvent),
    CallLater {
        room: String,
        fire_at: Instant,
        name: &'static str,
        callback: Callback,
    },
    StartPulse {
        room: String,
        interval: Duration,
    },
    Shutdown,
}

enum TimerKind {
    Deferred { name: &'static str, callback: Callback },
    Pulse,
}

struct Timer {
    fire_at: Instant,
    seq: u64,
    room: String,
    kind: TimerKind,
}

// Min-heap on (fire_at, seq): earliest first, insertion order on ties.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Timer {}

#[derive(Debug, Default, Clone, Copy)]
struct LoopStats {
    events: u64,
    deferred_fired: u64,
    deferred_skipped: u64,
    pulses_fired: u64,
    pulses_idle: u64,
}

/// Thread-safe entry point to the arbitrator.
#[derive(Clone)]
pub struct ArbitratorHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl ArbitratorHandle {
    fn send(&self, what: &str, request: Request) -> bool {
        if self.tx.send(request).is_err() {
            tracing::warn!("⚠️ Arbitrator gone, dropped {what}");
            return false;
        }
        true
    }

    /// Attach a room session. Replaces any session with the same room name.
    pub fn attach(&self, session: Box<dyn RoomSession>) {
        self.send("attach", Request::Attach(session));
    }

    /// End a room session. Its pending calls and pulse become no-ops.
    pub fn detach(&self, room: &str) {
        self.send("detach", Request::Detach(room.to_string()));
    }

    /// Deliver a chat message to a room's dispatcher.
    pub fn chat(&self, room: &str, msg: Message) {
        self.send("chat", Request::Chat(room.to_string(), msg));
    }

    /// Deliver an upload to a room's dispatcher.
    pub fn file(&self, room: &str, file: FileEvent) {
        self.send("file", Request::File(room.to_string(), file));
    }

    /// Run `callback` on the loop after `delay`, if `room` is still attached
    /// and connected by then. Fire-and-forget: failures are only logged.
    pub fn call_later<F>(&self, room: &str, delay: Duration, callback: F)
    where
        F: FnOnce(&Arc<dyn Room>) -> Result<()> + Send + 'static,
    {
        let name = std::any::type_name::<F>();
        tracing::debug!("call later scheduled for {room} in {delay:?}: {name}");
        self.send(
            "deferred call",
            Request::CallLater {
                room: room.to_string(),
                fire_at: Instant::now() + delay,
                name,
                callback: Box::new(callback),
            },
        );
    }

    /// Tick the room's pulse handlers every `interval`, starting now.
    pub fn start_pulse(&self, room: &str, interval: Duration) {
        self.send(
            "pulse",
            Request::StartPulse {
                room: room.to_string(),
                interval,
            },
        );
    }

    /// Stop the loop after the requests already queued.
    pub fn shutdown(&self) {
        self.send("shutdown", Request::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The loop itself. Build with [`Arbitrator::new`], then `tokio::spawn(arb.run())`.
pub struct Arbitrator {
    rx: mpsc::UnboundedReceiver<Request>,
    sessions: HashMap<String, Box<dyn RoomSession>>,
    /// Pulse interval per room; absence retires the room's pulse timer.
    pulses: HashMap<String, Duration>,
    timers: BinaryHeap<Timer>,
    seq: u64,
    stats: LoopStats,
}

impl Arbitrator {
    pub fn new() -> (Self, ArbitratorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let arbitrator = Self {
            rx,
            sessions: HashMap::new(),
            pulses: HashMap::new(),
            timers: BinaryHeap::new(),
            seq: 0,
            stats: LoopStats::default(),
        };
        (arbitrator, ArbitratorHandle { tx })
    }

    /// Run until [`ArbitratorHandle::shutdown`]. Attached sessions keep
    /// handles of their own, so dropping the caller's handles does not end
    /// the loop while any room is attached.
    pub async fn run(mut self) {
        tracing::info!("⏰ Arbitrator started");

        loop {
            let next = self.timers.peek().map(|t| t.fire_at);
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.handle_request(request),
                },
                _ = sleep_until(next) => self.fire_due(Instant::now()),
            }
        }

        let s = self.stats;
        tracing::info!(
            "🛑 Arbitrator stopped ({} events, {} calls fired, {} skipped, {} pulses, {} idle)",
            s.events,
            s.deferred_fired,
            s.deferred_skipped,
            s.pulses_fired,
            s.pulses_idle
        );
    }

    fn push_timer(&mut self, fire_at: Instant, room: String, kind: TimerKind) {
        self.seq += 1;
        self.timers.push(Timer {
            fire_at,
            seq: self.seq,
            room,
            kind,
        });
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Attach(session) => {
                let name = session.room().name().to_string();
                if self.sessions.insert(name.clone(), session).is_some() {
                    tracing::warn!("⚠️ Replaced existing session for {name}");
                } else {
                    tracing::info!("🔌 Room attached: {name}");
                }
            }
            Request::Detach(name) => {
                self.sessions.remove(&name);
                self.pulses.remove(&name);
                tracing::info!("🔌 Room detached: {name}");
            }
            Request::Chat(name, msg) => {
                self.stats.events += 1;
                match self.sessions.get_mut(&name) {
                    Some(session) => {
                        let now = Utc::now();
                        isolate("chat dispatch", &name, || {
                            session.on_message(&msg, now);
                            Ok(())
                        });
                    }
                    None => tracing::debug!("chat for unknown room {name} dropped"),
                }
            }
            Request::File(name, file) => {
                self.stats.events += 1;
                match self.sessions.get_mut(&name) {
                    Some(session) => {
                        isolate("file dispatch", &name, || {
                            session.on_file(&file);
                            Ok(())
                        });
                    }
                    None => tracing::debug!("file for unknown room {name} dropped"),
                }
            }
            Request::CallLater {
                room,
                fire_at,
                name,
                callback,
            } => {
                self.push_timer(fire_at, room, TimerKind::Deferred { name, callback });
            }
            Request::StartPulse { room, interval } => {
                if interval.is_zero() {
                    tracing::warn!("⚠️ Ignoring zero pulse interval for {room}");
                    return;
                }
                tracing::info!("💓 Pulse for {room} every {interval:?}");
                if self.pulses.insert(room.clone(), interval).is_none() {
                    self.push_timer(Instant::now(), room, TimerKind::Pulse);
                }
            }
            Request::Shutdown => {}
        }
    }

    /// Fire every timer due at or before `now`.
    fn fire_due(&mut self, now: Instant) {
        while self.timers.peek().is_some_and(|t| t.fire_at <= now) {
            let Some(timer) = self.timers.pop() else {
                break;
            };
            match timer.kind {
                TimerKind::Deferred { name, callback } => self.fire_deferred(&timer.room, name, callback),
                TimerKind::Pulse => self.fire_pulse(timer.room, timer.fire_at, now),
            }
        }
    }

    fn fire_deferred(&mut self, room: &str, name: &'static str, callback: Callback) {
        let target = self
            .sessions
            .get(room)
            .map(|s| s.room().clone())
            .filter(|r| r.is_connected());
        match target {
            Some(target) => {
                self.stats.deferred_fired += 1;
                isolate("deferred call", name, || callback(&target));
            }
            None => {
                self.stats.deferred_skipped += 1;
                tracing::debug!("deferred call for {room} skipped, room not connected");
            }
        }
    }

    fn fire_pulse(&mut self, room: String, fired_at: Instant, now: Instant) {
        let Some(interval) = self.pulses.get(&room).copied() else {
            tracing::debug!("pulse for {room} retired");
            return;
        };

        match self.sessions.get_mut(&room) {
            Some(session) if session.room().is_connected() => {
                self.stats.pulses_fired += 1;
                let wall = Utc::now();
                isolate("pulse dispatch", &room, || {
                    session.on_pulse(wall);
                    Ok(())
                });
            }
            _ => self.stats.pulses_idle += 1,
        }

        let mut next = fired_at + interval;
        if next <= now {
            next = now + interval;
        }
        self.push_timer(next, room, TimerKind::Pulse);
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
