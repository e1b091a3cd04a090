//! Dashboard session.
//!
//! A [`Session`] owns everything a live dashboard needs: the shared
//! [`Dashboard`] state, the alerts feed thread, the snapshot poll thread and
//! a channel of [`SessionEvent`]s that front ends redraw from.
//!
//! ```text
//!   alerts socket ──► feed thread ──┐
//!   poll ticker ──► fetch worker ───┼──► Arc<Mutex<Dashboard>> ──► SessionEvent
//!   user action ──► worker ─────────┘
//! ```
//!
//! Each fetch runs on its own short-lived worker, so a slow request never
//! delays the next tick. Whichever response lands last is what the snapshot
//! panel shows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::backend::Backend;
use crate::config::SentinelConfig;
use crate::dashboard::{Change, Dashboard};
use crate::feed::{AlertFeed, FeedEvent, FeedState};
use crate::journal::{EventKind, Journal, JournalEntry, Source};
use crate::protocol::FeedMessage;

/// Notification that something on the dashboard changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Changed(Change),
    /// A front end asked to leave.
    QuitRequested,
}

/// Session timing and feature switches, resolved from the config.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// `None` fetches once at start and never again.
    pub poll_interval: Option<Duration>,
    /// `None` runs without an alerts socket.
    pub feed: Option<AlertFeed>,
    pub log_tail: usize,
}

impl SessionOptions {
    pub fn from_config(config: &SentinelConfig) -> Result<Self> {
        let feed = if config.feed.enabled {
            Some(AlertFeed::from_config(config)?)
        } else {
            None
        };

        Ok(Self {
            poll_interval: config
                .poll
                .enabled
                .then(|| Duration::from_secs(config.poll.interval_secs.max(1))),
            feed,
            log_tail: config.feed.log_tail,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// What every session thread holds a clone of.
#[derive(Clone)]
struct Shared {
    dashboard: Arc<Mutex<Dashboard>>,
    backend: Arc<dyn Backend>,
    journal: Arc<Journal>,
    notify: Sender<SessionEvent>,
}

impl Shared {
    fn update<R>(&self, f: impl FnOnce(&mut Dashboard) -> R) -> R {
        let mut guard = self
            .dashboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn publish(&self, change: Change) {
        // The receiver may be gone once the front end has quit.
        let _ = self.notify.send(SessionEvent::Changed(change));
    }

    fn spawn_fetch(&self, source: Source) {
        let shared = self.clone();
        let spawned = thread::Builder::new()
            .name("snapshot-fetch".to_string())
            .spawn(move || shared.fetch(source));
        if let Err(e) = spawned {
            tracing::warn!("failed to spawn snapshot fetch: {e}");
        }
    }

    fn fetch(&self, source: Source) {
        let outcome = self.backend.fetch_system_data();
        if let Err(e) = &outcome {
            tracing::warn!("error fetching system data: {e:#}");
        }

        let (change, summary) = self.update(|d| {
            let change = d.apply_fetch(&outcome);
            (change, d.summary().cloned())
        });

        match (&outcome, summary) {
            (Ok(_), Some(summary)) => self.journal.record_snapshot(&summary, source),
            (Err(e), _) => self.journal.record_snapshot_error(format!("{e:#}"), source),
            (Ok(_), None) => {}
        }

        self.publish(change);
    }

    fn spawn_simulation(&self) {
        let shared = self.clone();
        let spawned = thread::Builder::new()
            .name("simulate-attack".to_string())
            .spawn(move || shared.simulate());
        if let Err(e) = spawned {
            tracing::warn!("failed to spawn simulation trigger: {e}");
        }
    }

    fn simulate(&self) {
        let outcome = self.backend.simulate_attack();
        let entry = match &outcome {
            Ok(message) => JournalEntry::new(EventKind::Simulation, Source::User, message.clone()),
            Err(e) => {
                tracing::warn!("error triggering simulation: {e:#}");
                JournalEntry::new(EventKind::SimulationError, Source::User, format!("{e:#}"))
            }
        };
        self.journal.record(&entry);

        let change = self.update(|d| d.apply_simulation(&outcome));
        self.publish(change);
    }

    fn on_feed_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::State(state) => self.on_feed_state(state),
            FeedEvent::Frame(raw) => self.on_frame(&raw),
        }
    }

    fn on_feed_state(&self, state: FeedState) {
        let (previous, change) = self.update(|d| (d.feed_state(), d.set_feed_state(state)));
        let Some(change) = change else {
            return;
        };

        match (previous, state) {
            (_, FeedState::Connected) => self.journal.record(&JournalEntry::new(
                EventKind::FeedConnected,
                Source::Push,
                "alert feed connected",
            )),
            (FeedState::Connected, _) => self.journal.record(&JournalEntry::new(
                EventKind::FeedClosed,
                Source::Push,
                format!("alert feed {state}"),
            )),
            _ => {}
        }

        self.publish(change);
    }

    fn on_frame(&self, raw: &str) {
        let message = match FeedMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("dropping feed frame: {e:#}");
                return;
            }
        };

        let (change, summary) = self.update(|d| {
            let change = d.apply_message(&message);
            (change, d.summary().cloned())
        });

        match &message {
            FeedMessage::Alert { alert, data } => {
                tracing::info!(alert = %alert, "alert received");
                let entry = JournalEntry::new(EventKind::Alert, Source::Push, alert.clone());
                self.journal.record(&match data {
                    Some(data) => entry.with_detail(data.clone()),
                    None => entry,
                });
            }
            FeedMessage::SystemData { .. } => {
                if let Some(summary) = summary {
                    self.journal.record_snapshot(&summary, Source::Push);
                }
            }
            FeedMessage::Log { line } => tracing::trace!(line = %line, "backend log"),
            FeedMessage::Ping => tracing::trace!("feed keepalive"),
            FeedMessage::Unknown { .. } => {
                tracing::debug!(kind = message.kind(), "ignoring feed frame");
            }
        }

        if let Some(change) = change {
            self.publish(change);
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A running dashboard session.
///
/// Created with [`Session::start`]; stopped with [`Session::stop`] or on
/// drop.
pub struct Session {
    shared: Shared,
    events: Option<Receiver<SessionEvent>>,
    stop_flag: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl Session {
    /// Start a session from the resolved config.
    pub fn from_config(config: &SentinelConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        let options = SessionOptions::from_config(config)?;
        let journal = Journal::from_config(&config.logging);
        Self::start(options, backend, journal)
    }

    /// Open the feed, make the first fetch and start the poll ticker.
    pub fn start(options: SessionOptions, backend: Arc<dyn Backend>, journal: Journal) -> Result<Self> {
        let (notify, events) = mpsc::channel();
        let shared = Shared {
            dashboard: Arc::new(Mutex::new(Dashboard::new(options.log_tail))),
            backend,
            journal: Arc::new(journal),
            notify,
        };

        let stop_flag = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let mut workers = Vec::new();

        if let Some(feed) = options.feed {
            let feed_shared = shared.clone();
            workers.push(crate::feed::spawn(feed, Arc::clone(&stop_flag), move |event| {
                feed_shared.on_feed_event(event)
            })?);
        }

        let poll_shared = shared.clone();
        let interval = options.poll_interval;
        workers.push(
            thread::Builder::new()
                .name("snapshot-poll".to_string())
                .spawn(move || run_poller(&poll_shared, interval, &stop_rx))
                .context("failed to spawn snapshot poll thread")?,
        );

        Ok(Self {
            shared,
            events: Some(events),
            stop_flag,
            stop_tx: Some(stop_tx),
            workers,
        })
    }

    /// Take the change-notification receiver. Returns `None` after the
    /// first call.
    pub fn take_events(&mut self) -> Option<Receiver<SessionEvent>> {
        self.events.take()
    }

    /// A cloneable handle for issuing user actions from other threads.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    /// Copy of the current dashboard state.
    pub fn dashboard(&self) -> Dashboard {
        self.shared.update(|d| d.clone())
    }

    /// Fetch a snapshot now, outside the poll schedule.
    pub fn refresh(&self) {
        self.shared.spawn_fetch(Source::User);
    }

    /// Trigger the backend's attack simulation.
    pub fn simulate_attack(&self) {
        self.shared.spawn_simulation();
    }

    /// Stop the feed and poll threads and wait for them.
    ///
    /// Fetch or simulation workers already in flight are left to finish on
    /// their own.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("session thread panicked");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

/// User actions that can be issued from any thread.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Shared,
}

impl SessionHandle {
    pub fn refresh(&self) {
        self.shared.spawn_fetch(Source::User);
    }

    pub fn simulate_attack(&self) {
        self.shared.spawn_simulation();
    }

    /// Clear the acknowledgment shown after a simulation trigger.
    pub fn dismiss_acknowledgment(&self) {
        if self.shared.update(|d| d.dismiss_acknowledgment()).is_some() {
            self.shared.publish(Change::Acknowledgment);
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        self.shared.update(|d| d.clone())
    }

    /// Ask the front end's event loop to exit.
    pub fn request_quit(&self) {
        let _ = self.shared.notify.send(SessionEvent::QuitRequested);
    }
}

/// Fetch immediately, then once per `interval` until told to stop.
fn run_poller(shared: &Shared, interval: Option<Duration>, stop_rx: &Receiver<()>) {
    shared.spawn_fetch(Source::Pull);

    let Some(interval) = interval else {
        return;
    };

    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => shared.spawn_fetch(Source::Pull),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

