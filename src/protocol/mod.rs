//! Wire types for the monitoring backend.
//!
//! The dashboard treats payloads as opaque JSON and shows them verbatim.
//! Only the `type` discriminant of feed frames is interpreted, plus a
//! best-effort [`SnapshotSummary`] used for the terminal status line and the
//! journal.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Status string the backend reports while a detection is active.
pub const THREAT_STATUS: &str = "ransomware detected";

// ---------------------------------------------------------------------------
// Feed frames
// ---------------------------------------------------------------------------

/// A decoded frame from the alerts socket.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// `{"type":"alert","alert":…,"data":…}`
    ///
    /// `data` is `None` when the field is absent, as opposed to `null`.
    Alert { alert: String, data: Option<Value> },
    /// `{"type":"system_data","data":…}`
    SystemData { data: Option<Value> },
    /// `{"type":"ping",…}` keepalive.
    Ping,
    /// `{"type":"live_tracking_log","log":…}` backend log line.
    Log { line: String },
    /// Any other discriminant, or none at all.
    Unknown { kind: Option<String> },
}

impl FeedMessage {
    /// Decode one text frame.
    ///
    /// Fails only when the frame is not JSON. A JSON value without a string
    /// `type` field decodes to [`FeedMessage::Unknown`].
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("feed frame is not valid JSON")?;
        Ok(Self::from_value(value))
    }

    /// Classify an already-decoded frame.
    pub fn from_value(mut value: Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);

        match kind.as_deref() {
            Some("alert") => Self::Alert {
                alert: value.get("alert").map_or_else(
                    || "undefined".to_string(),
                    display_value,
                ),
                data: take_field(&mut value, "data"),
            },
            Some("system_data") => Self::SystemData {
                data: take_field(&mut value, "data"),
            },
            Some("ping") => Self::Ping,
            Some("live_tracking_log") => Self::Log {
                line: value.get("log").map(display_value).unwrap_or_default(),
            },
            _ => Self::Unknown { kind },
        }
    }

    /// Short name used in logs and the journal.
    pub fn kind(&self) -> &str {
        match self {
            Self::Alert { .. } => "alert",
            Self::SystemData { .. } => "system_data",
            Self::Ping => "ping",
            Self::Log { .. } => "live_tracking_log",
            Self::Unknown { kind } => kind.as_deref().unwrap_or("<none>"),
        }
    }
}

fn take_field(value: &mut Value, key: &str) -> Option<Value> {
    value.get_mut(key).map(Value::take)
}

/// Render a JSON value the way string concatenation shows it: strings bare,
/// everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pretty-print JSON with two-space indentation, preserving key order.
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ---------------------------------------------------------------------------
// Snapshot summary
// ---------------------------------------------------------------------------

/// Typed view over the handful of snapshot fields worth a status line.
///
/// Accepts both the REST body (`{status, ml_model_dedicated, data:{…}}`) and
/// a bare snapshot (`{state, timestamp, cpu_usage, …}`). Every field is
/// optional; absent or mistyped fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_triggered: Option<bool>,
}

impl SnapshotSummary {
    pub fn from_value(value: &Value) -> Self {
        let inner = value.get("data").filter(|d| d.is_object()).unwrap_or(value);

        let status = value
            .get("status")
            .or_else(|| inner.get("state"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            status,
            timestamp: inner
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
            cpu_usage: inner.get("cpu_usage").and_then(Value::as_f64),
            memory_usage: inner.get("memory_usage").and_then(Value::as_f64),
            disk_usage: inner.get("disk_usage").and_then(Value::as_f64),
            response_triggered: inner.get("response_triggered").and_then(Value::as_bool),
        }
    }

    /// Whether the backend currently reports an active detection.
    pub fn is_threat(&self) -> bool {
        self.status.as_deref() == Some(THREAT_STATUS)
    }

    /// One-line description, e.g. `normal · cpu 12.5% · mem 40.1% · disk 55.0%`.
    pub fn headline(&self) -> String {
        let mut parts = vec![self.status.clone().unwrap_or_else(|| "unknown".to_string())];
        for (label, value) in [
            ("cpu", self.cpu_usage),
            ("mem", self.memory_usage),
            ("disk", self.disk_usage),
        ] {
            if let Some(v) = value {
                parts.push(format!("{label} {v:.1}%"));
            }
        }
        parts.join(" · ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
