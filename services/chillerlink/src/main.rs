//! Chiller operator console (`chillerlink`)
//!
//! Opens the serial link to the controller board and either prints readings,
//! sends one command, or runs an interactive console.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chillerlink::cli::{self, Cli, Command};
use chillerlink::config::SERVICE_NAME;
use chillerlink::{spawn_link_with_shutdown, SerialOpener};
use errors::{ConsoleError, ConsoleResult, ErrorInfo};

#[tokio::main]
async fn main() -> ConsoleResult<()> {
    let args = Cli::parse();

    if let Command::Presets = args.command {
        print!("{}", cli::render_presets());
        return Ok(());
    }

    common::logging::init_with_config(args.service.log_config(SERVICE_NAME))?;

    let config = cli::load_link_config(&args.service, &args.link)?;
    debug!(?config, "Link configuration loaded");

    let token = CancellationToken::new();
    let signals = common::shutdown::cancel_on_shutdown(token.clone());
    let (link, driver) =
        spawn_link_with_shutdown(config, Arc::new(SerialOpener), token.clone())?;

    let outcome = match args.command {
        Command::Monitor { interval_ms, json } => {
            cli::run_monitor(Arc::clone(&link), Duration::from_millis(interval_ms), json).await
        },
        Command::Send { wait_ms, text } => {
            cli::run_send(Arc::clone(&link), &text.join(" "), Duration::from_millis(wait_ms))
                .await
        },
        Command::Preset { name, wait_ms } => match cli::preset_by_name(&name) {
            Ok(preset) => {
                cli::run_send(
                    Arc::clone(&link),
                    &preset.intent.to_command(),
                    Duration::from_millis(wait_ms),
                )
                .await
            },
            Err(e) => Err(e),
        },
        Command::Console { interval_ms } => {
            eprintln!("{}", cli::console_banner(&link.config().port));
            cli::run_console(Arc::clone(&link), Duration::from_millis(interval_ms)).await
        },
        Command::Presets => Ok(()),
    };

    token.cancel();
    signals.abort();
    if let Err(e) = driver.await {
        error!("Link driver task failed: {}", e);
        return Err(ConsoleError::Runtime(e.to_string()));
    }

    match &outcome {
        Ok(()) => info!("{} stopped", SERVICE_NAME),
        Err(e) => {
            let info = ErrorInfo::from_error(e);
            error!(code = %info.code, retryable = info.retryable, "{} failed: {}", SERVICE_NAME, info.message);
        },
    }
    outcome
}
