//! Event journal: an append-only JSONL record of what the dashboard saw.
//!
//! Every alert, snapshot status change, simulation trigger and feed
//! connect/drop is written as one line to `~/.sentinel-dash/events.jsonl`
//! (configurable). `sentinel-dash events` reads it back through
//! [`summary`].
//!
//! All file I/O is best-effort: a journal that cannot be written never
//! affects the dashboard.

pub mod summary;

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{self, schema::LoggingConfig};
use crate::protocol::SnapshotSummary;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Alert,
    Snapshot,
    SnapshotError,
    Simulation,
    SimulationError,
    FeedConnected,
    FeedClosed,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Snapshot => "snapshot",
            Self::SnapshotError => "snapshot_error",
            Self::Simulation => "simulation",
            Self::SimulationError => "simulation_error",
            Self::FeedConnected => "feed_connected",
            Self::FeedClosed => "feed_closed",
        }
    }
}

/// Where the event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Pushed over the alerts socket.
    Push,
    /// Pulled from the REST endpoint.
    Pull,
    /// Triggered by the user.
    User,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::User => "user",
        }
    }
}

/// A single line in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub kind: EventKind,
    pub source: Source,
    /// Human-readable one-liner (alert text, snapshot headline, error).
    pub summary: String,
    /// Structured payload, when there is one worth keeping.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<Value>,
}

impl JournalEntry {
    pub fn new(kind: EventKind, source: Source, summary: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            source,
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Journal writer shared by a session's threads.
#[derive(Debug, Default)]
pub struct Journal {
    path: Option<PathBuf>,
    last_status: Mutex<Option<String>>,
}

impl Journal {
    /// A journal that writes to `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            last_status: Mutex::new(None),
        }
    }

    /// A journal that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.journal {
            return Self::disabled();
        }
        match config::expand_home(&config.journal_path) {
            Some(path) => Self::at(path),
            None => Self::disabled(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry. Failures are ignored.
    pub fn record(&self, entry: &JournalEntry) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = append_entry(path, entry) {
            tracing::debug!("journal write to {} failed: {e:#}", path.display());
        }
    }

    /// Record a snapshot only when its status differs from the last one
    /// recorded, so the periodic poll does not flood the file.
    pub fn record_snapshot(&self, summary: &SnapshotSummary, source: Source) {
        let status = summary
            .status
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        {
            let mut last = self
                .last_status
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() == Some(status.as_str()) {
                return;
            }
            *last = Some(status);
        }

        let detail = serde_json::to_value(summary).ok();
        let mut entry = JournalEntry::new(EventKind::Snapshot, source, summary.headline());
        entry.detail = detail;
        self.record(&entry);
    }

    /// Record a failed fetch and forget the last status, so the next good
    /// snapshot is written even when its status is unchanged.
    pub fn record_snapshot_error(&self, summary: impl Into<String>, source: Source) {
        self.last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.record(&JournalEntry::new(EventKind::SnapshotError, source, summary));
    }
}

fn append_entry(path: &Path, entry: &JournalEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read all entries from the journal at `path`.
///
/// Silently skips malformed lines. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_all_entries(path: &Path) -> Vec<JournalEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str::<JournalEntry>(&line).ok())
        .collect()
}

/// Read entries from the last `days` days. `None` returns everything.
pub fn read_entries_since_days(path: &Path, days: Option<u32>) -> Vec<JournalEntry> {
    let entries = read_all_entries(path);

    let Some(days) = days else {
        return entries;
    };

    let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
    entries
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
