/// Configuration system for sentinel-dash.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::SentinelConfig::default()`]
/// 2. **User global config**: `~/.sentinel-dash/config.toml`
/// 3. **Project local config**: `.sentinel-dash.toml` in the current directory
/// 4. **Environment variables**: `SENTINEL_DASH_*` overrides (highest precedence)
///
/// TOML layers are merged key by key before deserializing, so a project
/// file that only sets a handful of keys keeps everything the global file
/// set. `serde(default)` fills whatever no layer mentions.
///
/// # Usage
///
/// ```rust,ignore
/// use sentinel_dash::config;
///
/// let cfg = config::load();
/// let url = config::alerts_url(&cfg.backend)?;
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::SentinelConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> SentinelConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the defaults, later files winning key by
/// key.
///
/// A file only overrides the keys it sets; everything else comes from the
/// layers beneath it.
fn load_layers(paths: &[Option<PathBuf>]) -> SentinelConfig {
    let mut merged = toml::Value::Table(toml::Table::new());
    for layer in paths.iter().filter_map(|path| load_toml_file(path.as_deref())) {
        merge_toml(&mut merged, layer);
    }

    merged.try_into().unwrap_or_else(|e| {
        tracing::warn!("merged config is invalid, using defaults: {e}");
        SentinelConfig::default()
    })
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed. A malformed file falls back to the previous layer.
fn load_toml_file(path: Option<&Path>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("ignoring malformed config {}: {e}", path.display());
            return None;
        }
    };
    // Reject the whole file if its keys don't fit the schema.
    if let Err(e) = value.clone().try_into::<SentinelConfig>() {
        tracing::warn!("ignoring invalid config {}: {e}", path.display());
        return None;
    }
    Some(value)
}

/// Recursively overlay `overlay` onto `base`. Tables merge; any other value
/// replaces what was there.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.sentinel-dash/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sentinel-dash").join("config.toml"))
}

/// Path to the project local config: `.sentinel-dash.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".sentinel-dash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None if path == "~" => dirs::home_dir(),
        None => Some(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Derived endpoints
// ---------------------------------------------------------------------------

/// Build the alerts socket URL from the backend's HTTP base URL.
///
/// `http://host:port` becomes `ws://host:port/ws/alerts?token=<token>`;
/// `https` maps to `wss`.
pub fn alerts_url(backend: &schema::BackendConfig) -> Result<String> {
    let base = backend.url.trim_end_matches('/');
    let rest = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        anyhow::bail!("backend url must start with http:// or https://, got '{base}'");
    };
    Ok(format!("{rest}/ws/alerts?token={}", backend.token))
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `SENTINEL_DASH_URL`: backend HTTP base URL
/// - `SENTINEL_DASH_TOKEN`: alerts socket token
/// - `SENTINEL_DASH_POLL_SECS`: snapshot refresh interval
/// - `SENTINEL_DASH_RECONNECT`: reconnect the feed with backoff (`1`/`true`)
/// - `SENTINEL_DASH_LOG_LEVEL`: stderr diagnostic level
/// - `SENTINEL_DASH_JOURNAL`: event journal on/off
fn apply_env_overrides(config: &mut SentinelConfig) {
    if let Ok(val) = std::env::var("SENTINEL_DASH_URL")
        && !val.is_empty()
    {
        config.backend.url = val;
    }
    if let Ok(val) = std::env::var("SENTINEL_DASH_TOKEN")
        && !val.is_empty()
    {
        config.backend.token = val;
    }
    if let Ok(val) = std::env::var("SENTINEL_DASH_POLL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.poll.interval_secs = secs;
    }
    if let Ok(val) = std::env::var("SENTINEL_DASH_RECONNECT") {
        config.feed.reconnect = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("SENTINEL_DASH_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var("SENTINEL_DASH_JOURNAL") {
        config.logging.journal = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.sentinel-dash/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.sentinel-dash/ directory")?;
    }

    fs::write(&path, SentinelConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `backend.url`. The value is parsed according to
/// the type already stored under that key.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&SentinelConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject edits that would no longer load as a config.
    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    toml::from_str::<SentinelConfig>(&output)
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
