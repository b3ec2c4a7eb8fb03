//! Console command line
//!
//! A thin bench tool around [`LinkContext`]: it hosts the link, prints the
//! latest readings and submits operator commands typed as text or by preset.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use common::bootstrap_args::ServiceArgs;
use errors::{ConsoleError, ConsoleResult};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::catalog::{self, Panel};
use crate::command::CommandEncoder;
use crate::config::{LinkConfig, SERVICE_NAME};
use crate::driver::{LinkContext, LinkStatus};
use crate::intent::{find_preset, Preset, PRESETS};
use crate::telemetry::TelemetryRecord;

/// Floor for refresh periods passed in by library callers
const MIN_REFRESH: Duration = Duration::from_millis(1);

/// Chiller operator console
#[derive(Parser, Debug)]
#[command(
    name = "chillerlink",
    version = env!("CARGO_PKG_VERSION"),
    about = "Chiller operator console: serial telemetry and command link"
)]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub link: LinkOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Link settings that override the loaded configuration
#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct LinkOverrides {
    /// Serial device path
    #[arg(short = 'p', long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short = 'b', long = "baud", global = true)]
    #[serde(rename = "baud_rate", skip_serializing_if = "Option::is_none")]
    pub baud: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the latest readings on a fixed cadence
    Monitor {
        /// Refresh interval in milliseconds
        #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,
        /// Print each snapshot as one JSON line
        #[arg(long)]
        json: bool,
    },

    /// Send one command line and exit
    #[command(trailing_var_arg = true)]
    Send {
        /// How long to wait for the link to come up
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
        /// Command words, e.g. `PUMP EVAP ON`
        #[arg(required = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Send a named preset and exit
    Preset {
        name: String,
        /// How long to wait for the link to come up
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
    },

    /// List the available presets
    Presets,

    /// Interactive console: readings plus commands from stdin (`:name` for presets)
    Console {
        /// Refresh interval in milliseconds
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,
    },
}

/// Load the link configuration and apply command-line overrides
pub fn load_link_config(service: &ServiceArgs, overrides: &LinkOverrides) -> ConsoleResult<LinkConfig> {
    let config: LinkConfig = common::config_loader::load_config(
        SERVICE_NAME,
        service.config.as_deref(),
        overrides,
    )?;
    config.validate()?;
    Ok(config)
}

/// One-line connection summary
pub fn render_status(status: &LinkStatus) -> String {
    let age = match status.telemetry_age_ms {
        Some(ms) => format!("{}ms", ms),
        None => "--".to_string(),
    };
    format!(
        "[{}] {} seq={} age={} rx_errors={} overflows={} tx={} dropped={}",
        status.state,
        status.port,
        status.sequence,
        age,
        status.stats.decode_errors,
        status.stats.buffer_overflows,
        status.stats.commands_sent,
        status.stats.commands_dropped,
    )
}

/// Readings grouped by panel; alarms list only the active ones
pub fn render_panels(record: &TelemetryRecord) -> String {
    let mut out = String::new();
    for panel in Panel::ALL {
        if panel == Panel::Alarms {
            let active = catalog::active_alarms(record);
            let names: Vec<_> = active.iter().map(|f| f.label).collect();
            let _ = writeln!(
                out,
                "{}: {}",
                panel.title(),
                if names.is_empty() {
                    "none".to_string()
                } else {
                    names.join(", ")
                }
            );
            continue;
        }

        let _ = writeln!(out, "{}", panel.title());
        for field in panel.fields() {
            let _ = writeln!(
                out,
                "  {:<24}{:>12} {}",
                field.label,
                catalog::format_field(record, field),
                field.unit
            );
        }
    }
    out
}

/// Preset table for `presets`
pub fn render_presets() -> String {
    let width = PRESETS.iter().map(|p| p.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for preset in PRESETS {
        let _ = writeln!(
            out,
            "{:<width$}  {:<28}  {}",
            preset.name,
            preset.intent.to_command(),
            preset.description,
            width = width
        );
    }
    out
}

/// One line of console input
#[derive(Debug, PartialEq)]
pub enum ConsoleInput {
    Preset(&'static Preset),
    UnknownPreset(String),
    /// `:log <filter>` swaps the active log filter
    LogLevel(String),
    Raw(String),
    Empty,
}

pub fn parse_console_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }
    match line.strip_prefix(':') {
        Some(rest) => match rest.strip_prefix("log ") {
            Some(filter) => ConsoleInput::LogLevel(filter.trim().to_string()),
            None => match find_preset(rest) {
                Some(preset) => ConsoleInput::Preset(preset),
                None => ConsoleInput::UnknownPreset(rest.trim().to_string()),
            },
        },
        None => ConsoleInput::Raw(line.to_string()),
    }
}

fn print_snapshot(ctx: &LinkContext, json: bool) {
    if json {
        let snapshot = ctx.store().get();
        match serde_json::to_string(&*snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Snapshot serialization failed"),
        }
    } else {
        println!("{}", render_status(&ctx.status()));
        print!("{}", render_panels(&ctx.store().record()));
    }
}

/// Print readings until shutdown
pub async fn run_monitor(ctx: Arc<LinkContext>, every: Duration, json: bool) -> ConsoleResult<()> {
    let mut ticker = interval(every.max(MIN_REFRESH));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = ctx.shutdown_token();
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => print_snapshot(&ctx, json),
        }
    }
    Ok(())
}

/// Wait for the link, send `text` once
pub async fn run_send(ctx: Arc<LinkContext>, text: &str, wait: Duration) -> ConsoleResult<()> {
    if CommandEncoder::encode(text).is_none() {
        return Err(errors::validation_error!("nothing to send"));
    }
    if !ctx.wait_connected(wait).await {
        return Err(ConsoleError::Timeout(format!(
            "{} not connected within {:?}",
            ctx.config().port,
            wait
        )));
    }
    if ctx.submit(text).await {
        info!("Sent: {}", text.trim());
        Ok(())
    } else {
        Err(ConsoleError::Link(format!("command not delivered: {}", text.trim())))
    }
}

/// Resolve a preset name for `preset`
pub fn preset_by_name(name: &str) -> ConsoleResult<&'static Preset> {
    find_preset(name).ok_or_else(|| ConsoleError::UnknownPreset(name.to_string()))
}

/// Readings on a slow cadence plus one command per stdin line
pub async fn run_console(ctx: Arc<LinkContext>, every: Duration) -> ConsoleResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(every.max(MIN_REFRESH));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = ctx.shutdown_token();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => println!("{}", render_status(&ctx.status())),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_console_line(&line) {
                    ConsoleInput::Empty => print_snapshot(&ctx, false),
                    ConsoleInput::Preset(preset) => {
                        ctx.submit_intent(&preset.intent).await;
                    },
                    ConsoleInput::UnknownPreset(name) => {
                        println!("unknown preset '{}'; try `chillerlink presets`", name);
                    },
                    ConsoleInput::LogLevel(filter) => {
                        if let Err(e) = common::logging::set_log_level(&filter) {
                            println!("{}", e);
                        }
                    },
                    ConsoleInput::Raw(text) => {
                        ctx.submit(&text).await;
                    },
                }
            },
        }
    }
    Ok(())
}

/// Startup hint for console mode
pub fn console_banner(port: &str) -> String {
    format!(
        "chillerlink console on {} (enter a command, :preset, :log <filter>, or a blank line for readings)",
        port
    )
}
