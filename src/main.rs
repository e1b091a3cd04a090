use anyhow::Result;
use clap::{Parser, Subcommand};

use sentinel_dash::{cli, config, logging, web};

#[derive(Debug, Parser)]
#[command(name = "sentinel-dash")]
#[command(about = "Live alert and system-state dashboard for a ransomware monitoring backend")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Terminal dashboard: live alerts, polled snapshots, simulate trigger
    Watch {
        /// Print the first snapshot and exit
        #[arg(long)]
        once: bool,
    },
    /// Serve the browser dashboard
    Web {
        /// Address to bind (default: from config, 127.0.0.1:9750)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_open: bool,
    },
    /// Fetch one system snapshot and print it
    Snapshot {
        /// Output format: text (default), json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Trigger the backend's ransomware simulation
    Simulate,
    /// Check config, backend reachability, alerts socket and journal
    Health,
    /// Summarize the event journal
    Events {
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective (merged) configuration
    Show,
    /// Write a default config to ~/.sentinel-dash/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `feed.reconnect true`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let cfg = config::load();
    logging::init(&cfg.logging);

    match app.command {
        Commands::Watch { once } => cli::run_watch(&cfg, once),
        Commands::Web { addr, no_open } => {
            let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
            web::serve(&addr, &cfg, cfg.web.open_browser && !no_open)
        }
        Commands::Snapshot { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_snapshot(&cfg, fmt)
        }
        Commands::Simulate => cli::run_simulate(&cfg),
        Commands::Health => cli::run_health(&cfg),
        Commands::Events { days, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_events(&cfg, fmt, days)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
