//! Terminal rendering for `sentinel-dash watch`.

use colored::Colorize;

use super::Dashboard;
use crate::feed::FeedState;

/// ANSI sequence that clears the screen and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Render the whole dashboard as a block of text.
pub fn render(dash: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}  {}  feed: {}\n",
        "Sentinel Dashboard".bold().cyan(),
        "·".dimmed(),
        colorize_feed(dash.feed_state()),
    ));
    out.push_str(&"=".repeat(60));
    out.push('\n');

    if let Some(summary) = dash.summary() {
        let headline = summary.headline();
        let headline = if summary.is_threat() {
            headline.red().bold()
        } else {
            headline.green()
        };
        out.push_str(&format!("  {} {}\n", "Status:".bold(), headline));
    }
    if let Some(at) = dash.snapshot_updated() {
        out.push_str(&format!(
            "  {} {}\n",
            "Updated:".bold(),
            at.format("%H:%M:%S").to_string().dimmed()
        ));
    }
    out.push('\n');

    if dash.alert().visible {
        out.push_str(&format!("{}\n", "Security Alert".bold().red()));
        for line in dash.alert().text.lines() {
            out.push_str(&format!("  {}\n", line.red()));
        }
        out.push('\n');
    }

    out.push_str(&format!("{}\n", "System Data".bold().cyan()));
    for line in dash.snapshot_text().lines() {
        out.push_str(&format!("  {line}\n"));
    }

    let tail: Vec<&str> = dash.log_tail().collect();
    if !tail.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n", "Backend Log".bold().cyan()));
        for line in tail {
            out.push_str(&format!("  {}\n", line.dimmed()));
        }
    }

    if let Some(ack) = dash.acknowledgment() {
        out.push('\n');
        out.push_str(&format!("{} {}\n", "›".yellow().bold(), ack.yellow()));
    }

    out.push('\n');
    out.push_str(&format!(
        "{}\n",
        "[r] refresh  [s] simulate attack  [d] dismiss  [q] quit".dimmed()
    ));
    out
}

fn colorize_feed(state: FeedState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        FeedState::Connected => text.green(),
        FeedState::Connecting | FeedState::Retrying { .. } => text.yellow(),
        FeedState::Disconnected => text.red(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
