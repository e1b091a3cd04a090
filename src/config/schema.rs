/// Configuration schema and defaults for sentinel-dash.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[backend]`, `[poll]`, `[feed]`, `[web]`, and `[logging]`.
///
/// Every field has a built-in default matching the monitoring backend's
/// stock deployment (`http://127.0.0.1:8001`). Users only need to set the
/// values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level sentinel-dash configuration.
///
/// Maps directly to `~/.sentinel-dash/config.toml` and `.sentinel-dash.toml`.
/// All sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub feed: FeedConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the monitoring backend lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// HTTP base URL. The alerts socket URL is derived from it
    /// (`http` → `ws`, `https` → `wss`).
    pub url: String,
    /// Static token appended to the alerts socket URL as `?token=`.
    pub token: String,
    /// Per-request HTTP timeout in milliseconds. `0` disables the timeout.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8001".to_string(),
            token: "mysecrettoken".to_string(),
            timeout_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// [poll]
// ---------------------------------------------------------------------------

/// Snapshot auto-refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// When `false`, only the initial fetch at startup is made.
    pub enabled: bool,
    /// Seconds between snapshot fetches.
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// [feed]
// ---------------------------------------------------------------------------

/// Alerts socket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Whether to open the alerts socket at all.
    pub enabled: bool,
    /// Reconnect with exponential backoff after the socket drops.
    /// Off by default: a dropped feed stays silent until restart.
    pub reconnect: bool,
    /// First reconnect delay (milliseconds).
    pub initial_backoff_ms: u64,
    /// Upper bound for the reconnect delay (milliseconds).
    pub max_backoff_ms: u64,
    /// Give up after this many consecutive failed attempts. `0` = never.
    pub max_attempts: u32,
    /// Socket read timeout (milliseconds). Bounds how long `stop()` waits
    /// for the reader thread.
    pub read_timeout_ms: u64,
    /// TCP connect and upgrade handshake timeout (milliseconds).
    pub connect_timeout_ms: u64,
    /// Number of backend log lines kept in the dashboard's log tail.
    pub log_tail: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect: false,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            max_attempts: 0,
            read_timeout_ms: 250,
            connect_timeout_ms: 5000,
            log_tail: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Embedded HTML dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `sentinel-dash web`.
    pub addr: String,
    /// Open the page in the default browser on startup.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9750".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Diagnostics and event journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Stderr diagnostic level: `"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Whether to append feed events to the JSONL journal.
    pub journal: bool,
    /// Journal path. `~` is expanded to the home directory.
    pub journal_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            journal: true,
            journal_path: "~/.sentinel-dash/events.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl SentinelConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `sentinel-dash config init` to create a commented config file.
    pub fn default_toml() -> String {
        r#"# sentinel-dash Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (SENTINEL_DASH_*)
#   2. Project config (.sentinel-dash.toml in current directory)
#   3. User global config (~/.sentinel-dash/config.toml)
#   4. Built-in defaults

[backend]
url = "http://127.0.0.1:8001"  # Alerts socket URL is derived from this
token = "mysecrettoken"        # Sent as ?token= on the alerts socket
timeout_ms = 0                 # 0 = no HTTP timeout

[poll]
enabled = true
interval_secs = 10

[feed]
enabled = true
reconnect = false              # Set true to reconnect with backoff after a drop
initial_backoff_ms = 1000
max_backoff_ms = 30000
max_attempts = 0               # 0 = keep retrying
read_timeout_ms = 250
connect_timeout_ms = 5000
log_tail = 50

[web]
addr = "127.0.0.1:9750"
open_browser = true

[logging]
level = "warn"                 # error | warn | info | debug | trace
journal = true
journal_path = "~/.sentinel-dash/events.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
