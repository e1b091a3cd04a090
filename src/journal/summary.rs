//! Journal aggregation for `sentinel-dash events`.

use std::collections::HashMap;

use super::{EventKind, JournalEntry};

/// How many recent alerts a summary keeps.
pub const RECENT_ALERTS: usize = 10;

/// Aggregated view over a slice of journal entries.
#[derive(Debug, Default)]
pub struct JournalSummary {
    pub total_events: usize,
    /// Count per kind, in first-seen order.
    pub kinds: Vec<(EventKind, usize)>,
    /// Most recent alerts, newest first.
    pub recent_alerts: Vec<JournalEntry>,
    /// Last recorded snapshot headline.
    pub last_status: Option<String>,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

impl JournalSummary {
    pub fn count(&self, kind: EventKind) -> usize {
        self.kinds
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }
}

pub fn summarize(entries: &[JournalEntry]) -> JournalSummary {
    let mut order: Vec<EventKind> = Vec::new();
    let mut counts: HashMap<EventKind, usize> = HashMap::new();

    for entry in entries {
        let count = counts.entry(entry.kind).or_insert_with(|| {
            order.push(entry.kind);
            0
        });
        *count += 1;
    }

    let recent_alerts = entries
        .iter()
        .rev()
        .filter(|e| e.kind == EventKind::Alert)
        .take(RECENT_ALERTS)
        .cloned()
        .collect();

    let last_status = entries
        .iter()
        .rev()
        .find(|e| e.kind == EventKind::Snapshot)
        .map(|e| e.summary.clone());

    JournalSummary {
        total_events: entries.len(),
        kinds: order
            .into_iter()
            .map(|k| (k, counts.get(&k).copied().unwrap_or(0)))
            .collect(),
        recent_alerts,
        last_status,
        first_timestamp: entries.first().map(|e| e.timestamp.clone()),
        last_timestamp: entries.last().map(|e| e.timestamp.clone()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
