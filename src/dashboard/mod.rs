//! Dashboard display state.
//!
//! [`Dashboard`] owns the regions a viewer sees: the alert panel, the
//! snapshot panel, the acknowledgment for the last simulation trigger, a
//! short tail of backend log lines and the feed connection state. Every
//! update is a last-write-wins overwrite; nothing orders pushed frames
//! against fetched snapshots.

pub mod render;

use std::collections::VecDeque;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::Value;

use crate::feed::FeedState;
use crate::protocol::{FeedMessage, SnapshotSummary, pretty_json};

/// Snapshot text before the first fetch or push lands.
pub const LOADING_TEXT: &str = "Loading...";
/// Snapshot text after a failed fetch.
pub const FETCH_ERROR_TEXT: &str = "Error fetching system data.";
/// Acknowledgment after a failed simulation trigger.
pub const SIMULATION_ERROR_TEXT: &str = "Error triggering simulation.";

/// The region an update touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Alert,
    Snapshot,
    Acknowledgment,
    Log,
    Feed,
}

/// The alert panel: hidden until the first alert arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertPanel {
    pub visible: bool,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    alert: AlertPanel,
    snapshot: String,
    summary: Option<SnapshotSummary>,
    snapshot_updated: Option<DateTime<Local>>,
    acknowledgment: Option<String>,
    log_tail: VecDeque<String>,
    log_capacity: usize,
    feed: FeedState,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Dashboard {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            alert: AlertPanel::default(),
            snapshot: LOADING_TEXT.to_string(),
            summary: None,
            snapshot_updated: None,
            acknowledgment: None,
            log_tail: VecDeque::with_capacity(log_capacity),
            log_capacity,
            feed: FeedState::default(),
        }
    }

    // -- Accessors --

    pub fn alert(&self) -> &AlertPanel {
        &self.alert
    }

    pub fn snapshot_text(&self) -> &str {
        &self.snapshot
    }

    pub fn summary(&self) -> Option<&SnapshotSummary> {
        self.summary.as_ref()
    }

    pub fn snapshot_updated(&self) -> Option<DateTime<Local>> {
        self.snapshot_updated
    }

    pub fn acknowledgment(&self) -> Option<&str> {
        self.acknowledgment.as_deref()
    }

    pub fn log_tail(&self) -> impl Iterator<Item = &str> {
        self.log_tail.iter().map(String::as_str)
    }

    pub fn feed_state(&self) -> FeedState {
        self.feed
    }

    // -- Updates --

    /// Decode one raw feed frame and apply it.
    ///
    /// A frame that is not JSON is rejected and leaves every region as it
    /// was. Returns the region that changed, or `None` when the frame type
    /// has nothing to show.
    pub fn on_message(&mut self, raw: &str) -> Result<Option<Change>> {
        let message = FeedMessage::parse(raw)?;
        Ok(self.apply_message(&message))
    }

    /// Apply an already-decoded feed frame.
    pub fn apply_message(&mut self, message: &FeedMessage) -> Option<Change> {
        match message {
            FeedMessage::Alert { alert, data } => {
                let detail = data.as_ref().map_or_else(|| "undefined".to_string(), pretty_json);
                self.alert = AlertPanel {
                    visible: true,
                    text: format!("ALERT: {alert}\n{detail}"),
                };
                Some(Change::Alert)
            }
            FeedMessage::SystemData { data: Some(data) } => {
                self.set_snapshot(data);
                Some(Change::Snapshot)
            }
            // Nothing to stringify, so the panel is blanked.
            FeedMessage::SystemData { data: None } => {
                self.snapshot.clear();
                self.summary = None;
                self.snapshot_updated = Some(Local::now());
                Some(Change::Snapshot)
            }
            FeedMessage::Log { line } => {
                if self.log_capacity == 0 {
                    return None;
                }
                while self.log_tail.len() >= self.log_capacity {
                    self.log_tail.pop_front();
                }
                self.log_tail.push_back(line.clone());
                Some(Change::Log)
            }
            FeedMessage::Ping | FeedMessage::Unknown { .. } => None,
        }
    }

    /// Apply the outcome of a snapshot fetch.
    pub fn apply_fetch(&mut self, outcome: &Result<Value>) -> Change {
        match outcome {
            Ok(body) => self.set_snapshot(body),
            Err(_) => {
                self.snapshot = FETCH_ERROR_TEXT.to_string();
                self.snapshot_updated = Some(Local::now());
            }
        }
        Change::Snapshot
    }

    /// Apply the outcome of a simulation trigger.
    pub fn apply_simulation(&mut self, outcome: &Result<String>) -> Change {
        self.acknowledgment = Some(match outcome {
            Ok(message) => message.clone(),
            Err(_) => SIMULATION_ERROR_TEXT.to_string(),
        });
        Change::Acknowledgment
    }

    /// Clear the acknowledgment once it has been seen.
    pub fn dismiss_acknowledgment(&mut self) -> Option<String> {
        self.acknowledgment.take()
    }

    pub fn set_feed_state(&mut self, state: FeedState) -> Option<Change> {
        if self.feed == state {
            return None;
        }
        self.feed = state;
        Some(Change::Feed)
    }

    fn set_snapshot(&mut self, value: &Value) {
        self.snapshot = pretty_json(value);
        self.summary = Some(SnapshotSummary::from_value(value));
        self.snapshot_updated = Some(Local::now());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
