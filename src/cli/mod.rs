//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `sentinel-dash watch`: live terminal dashboard
//! - `sentinel-dash snapshot`: one-shot `/system_data` fetch
//! - `sentinel-dash simulate`: trigger the backend's attack simulation
//! - `sentinel-dash health`: config, backend, alerts socket, journal
//! - `sentinel-dash events`: journal summary
//! - `sentinel-dash config show|init|set|reset`: configuration management
//!
//! `sentinel-dash web` lives in [`crate::web`].

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::backend::{Backend, BackendClient};
use crate::config::{self, SentinelConfig};
use crate::dashboard::render::{CLEAR_SCREEN, render};
use crate::dashboard::{Change, FETCH_ERROR_TEXT, SIMULATION_ERROR_TEXT};
use crate::feed;
use crate::journal::summary::{self, JournalSummary};
use crate::journal::{self, JournalEntry};
use crate::protocol::{SnapshotSummary, pretty_json};
use crate::session::{Session, SessionEvent, SessionHandle};

/// Output format for report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// sentinel-dash watch
// ---------------------------------------------------------------------------

/// A line typed into the terminal dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    Refresh,
    Simulate,
    Dismiss,
    Quit,
}

impl WatchCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "r" | "refresh" => Some(Self::Refresh),
            "s" | "simulate" => Some(Self::Simulate),
            "d" | "dismiss" => Some(Self::Dismiss),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Run the terminal dashboard until the user quits.
///
/// With `once`, waits for the first snapshot (or fetch error), prints the
/// dashboard a single time and exits.
pub fn run_watch(cfg: &SentinelConfig, once: bool) -> Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(BackendClient::from_config(&cfg.backend));
    let mut session = Session::from_config(cfg, backend)?;
    let events = session
        .take_events()
        .context("session events already taken")?;

    if once {
        for event in events.iter() {
            if event == SessionEvent::Changed(Change::Snapshot) {
                break;
            }
        }
        session.stop();
        print!("{}", render(&session.dashboard()));
        return Ok(());
    }

    spawn_input(session.handle())?;
    redraw(&render(&session.dashboard()))?;

    for event in events.iter() {
        match event {
            SessionEvent::QuitRequested => break,
            SessionEvent::Changed(_) => redraw(&render(&session.dashboard()))?,
        }
    }

    session.stop();
    Ok(())
}

fn redraw(screen: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "{CLEAR_SCREEN}{screen}")?;
    out.flush()?;
    Ok(())
}

/// Read typed commands from stdin on a background thread.
///
/// End of input counts as quit.
fn spawn_input(handle: SessionHandle) -> Result<()> {
    thread::Builder::new()
        .name("watch-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match WatchCommand::parse(&line) {
                    Some(WatchCommand::Refresh) => handle.refresh(),
                    Some(WatchCommand::Simulate) => handle.simulate_attack(),
                    Some(WatchCommand::Dismiss) => handle.dismiss_acknowledgment(),
                    Some(WatchCommand::Quit) => break,
                    None => {}
                }
            }
            handle.request_quit();
        })
        .context("failed to spawn input thread")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// sentinel-dash snapshot
// ---------------------------------------------------------------------------

/// Fetch one snapshot and print it.
pub fn run_snapshot(cfg: &SentinelConfig, format: OutputFormat) -> Result<()> {
    let client = BackendClient::from_config(&cfg.backend);

    let data = match client.fetch_system_data() {
        Ok(data) => data,
        Err(e) => {
            println!("{}", FETCH_ERROR_TEXT.red());
            return Err(e);
        }
    };

    match format {
        OutputFormat::Json | OutputFormat::Csv => println!("{}", pretty_json(&data)),
        OutputFormat::Table => {
            let summary = SnapshotSummary::from_value(&data);
            let headline = if summary.is_threat() {
                summary.headline().red().bold()
            } else {
                summary.headline().green()
            };
            println!("{} {}", "Status:".bold(), headline);
            println!();
            println!("{}", pretty_json(&data));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// sentinel-dash simulate
// ---------------------------------------------------------------------------

/// Trigger the simulation and print the backend's acknowledgment.
pub fn run_simulate(cfg: &SentinelConfig) -> Result<()> {
    let client = BackendClient::from_config(&cfg.backend);

    match client.simulate_attack() {
        Ok(message) => {
            println!("{} {}", "✓".green().bold(), message);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), SIMULATION_ERROR_TEXT);
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// sentinel-dash health
// ---------------------------------------------------------------------------

/// Check config files, backend reachability, the alerts socket and the
/// journal.
pub fn run_health(cfg: &SentinelConfig) -> Result<()> {
    println!("{}", "Sentinel Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    // 0. Config file status
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.sentinel-dash/config.toml found"
        } else {
            "not found (run `sentinel-dash config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".sentinel-dash.toml found"
        } else {
            "none (optional)"
        },
    );

    // 1. Backend REST endpoints
    let client = BackendClient::from_config(&cfg.backend);
    match client.welcome() {
        Ok(message) => print_health_item(
            "Backend",
            true,
            &format!("reachable at {} ({})", client.base_url(), truncate(&message, 40)),
        ),
        Err(e) => print_health_item("Backend", false, &format!("{e:#}")),
    }
    match client.fetch_system_data() {
        Ok(data) => print_health_item(
            "Snapshot",
            true,
            &SnapshotSummary::from_value(&data).headline(),
        ),
        Err(e) => print_health_item("Snapshot", false, &format!("{e:#}")),
    }

    // 2. Alerts socket handshake
    let read_timeout = Duration::from_millis(cfg.feed.read_timeout_ms.max(10));
    let connect_timeout = Duration::from_millis(cfg.feed.connect_timeout_ms.max(10));
    let handshake = config::alerts_url(&cfg.backend).and_then(|url| {
        feed::connect(&url, read_timeout, connect_timeout).map(|socket| (url, socket))
    });
    match handshake {
        Ok((url, mut socket)) => {
            let _ = socket.close(None);
            let _ = socket.flush();
            print_health_item("Alerts socket", true, &format!("handshake ok at {url}"));
        }
        Err(e) => print_health_item("Alerts socket", false, &format!("{e:#}")),
    }
    print_health_item(
        "Reconnect",
        true,
        if cfg.feed.reconnect {
            "on (exponential backoff)"
        } else {
            "off (set feed.reconnect = true to enable)"
        },
    );
    print_health_item(
        "Snapshot poll",
        cfg.poll.enabled,
        &if cfg.poll.enabled {
            format!("every {}s", cfg.poll.interval_secs.max(1))
        } else {
            "disabled (fetch once at start)".to_string()
        },
    );

    // 3. Journal
    let journal_path = config::expand_home(&cfg.logging.journal_path);
    let journal_exists = journal_path.as_deref().is_some_and(|p| p.exists());
    let journal_detail = match (&journal_path, cfg.logging.journal) {
        (_, false) => "disabled".to_string(),
        (Some(path), true) if journal_exists => format!(
            "{} entries",
            format_number(journal::read_all_entries(path).len())
        ),
        _ => "no journal file yet".to_string(),
    };
    print_health_item("Event journal", journal_exists, &journal_detail);

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// sentinel-dash events
// ---------------------------------------------------------------------------

/// Summarize the event journal.
pub fn run_events(cfg: &SentinelConfig, format: OutputFormat, days: Option<u32>) -> Result<()> {
    let entries = config::expand_home(&cfg.logging.journal_path)
        .map(|path| journal::read_entries_since_days(&path, days))
        .unwrap_or_default();

    if entries.is_empty() {
        println!(
            "{}",
            "No events recorded yet. Run `sentinel-dash watch` to start journaling.".yellow()
        );
        return Ok(());
    }

    let summary = summary::summarize(&entries);
    match format {
        OutputFormat::Json => print_events_json(&summary)?,
        OutputFormat::Csv => print_events_csv(&entries),
        OutputFormat::Table => print_events_table(&summary, days),
    }

    Ok(())
}

fn print_events_table(summary: &JournalSummary, days: Option<u32>) {
    let title = match days {
        Some(days) => format!("Sentinel Event Journal, last {days} days"),
        None => "Sentinel Event Journal".to_string(),
    };
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(60));
    println!();

    println!("  {} {}", "Total events:".bold(), format_number(summary.total_events));
    if let (Some(first), Some(last)) = (&summary.first_timestamp, &summary.last_timestamp) {
        println!(
            "  {} {} → {}",
            "Range:       ".bold(),
            truncate(first, 19),
            truncate(last, 19)
        );
    }
    if let Some(status) = &summary.last_status {
        println!("  {} {}", "Last status: ".bold(), status);
    }
    println!();

    println!("{}", "Events by Kind".bold().cyan());
    for (kind, count) in &summary.kinds {
        println!("  {:<20} {:>8}", kind.as_str(), format_number(*count));
    }

    if !summary.recent_alerts.is_empty() {
        println!();
        println!("{}", "Recent Alerts".bold().cyan());
        println!("  {:<20} Alert", "Time");
        println!("  {}", "-".repeat(58));
        for (i, entry) in summary.recent_alerts.iter().enumerate() {
            let line = format!(
                "  {:<20} {}",
                truncate(&entry.timestamp, 19),
                truncate(&entry.summary, 38)
            );
            if i % 2 == 0 {
                println!("{}", line.red());
            } else {
                println!("{}", line.red().dimmed());
            }
        }
    }
}

fn print_events_json(summary: &JournalSummary) -> Result<()> {
    let kinds: serde_json::Map<String, serde_json::Value> = summary
        .kinds
        .iter()
        .map(|(kind, count)| (kind.as_str().to_string(), serde_json::json!(count)))
        .collect();

    let value = serde_json::json!({
        "total_events": summary.total_events,
        "first_timestamp": summary.first_timestamp,
        "last_timestamp": summary.last_timestamp,
        "last_status": summary.last_status,
        "kinds": kinds,
        "recent_alerts": summary.recent_alerts,
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_events_csv(entries: &[JournalEntry]) {
    println!("timestamp,kind,source,summary");
    for entry in entries {
        println!(
            "{},{},{},{}",
            entry.timestamp,
            entry.kind.as_str(),
            entry.source.as_str(),
            csv_field(&entry.summary),
        );
    }
}

// ---------------------------------------------------------------------------
// sentinel-dash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective Sentinel Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.sentinel-dash/config.toml");
    print_source(project_exists, ".sentinel-dash.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "SENTINEL_DASH_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.sentinel-dash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to point at your monitoring backend.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
