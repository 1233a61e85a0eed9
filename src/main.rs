//! stopd - run shutdown hooks in priority order when the process is asked to stop
//!
//! Usage:
//!     stopd --config <path>
//!
//! See --help for more options.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use stop_dispatcher::callback::{Callback, CommandHook, TimeoutGuard};
use stop_dispatcher::config::{Config, load_config};
use stop_dispatcher::emitter::{Emitter, KillerSignalEmitter, SignalEmitter};
use stop_dispatcher::util::init_logging;
use stop_dispatcher::{Dispatcher, handler};

/// Wait for a stop signal, then run the configured shutdown hooks.
#[derive(Parser, Debug)]
#[command(name = "stopd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.config.display()
        )
    })?;

    // CLI overrides config
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    init_logging(log_level, &config.global.log_format)
        .context("failed to initialize logging")?;

    if cli.validate {
        info!("Configuration is valid");
        println!("Configuration is valid.");
        println!("  Signals: {:?}", config.shutdown.signals);
        println!("  Hooks: {}", config.hooks.len());
        for hook in &config.hooks {
            println!(
                "    - {} (priority {}) -> {}",
                hook.name,
                hook.priority,
                hook.command.join(" ")
            );
        }
        return Ok(());
    }

    info!(
        config_path = %cli.config.display(),
        hooks = config.hooks.len(),
        signals = ?config.shutdown.signals,
        "stopd starting"
    );

    run(config)
}

/// Run the dispatcher with the given configuration.
fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async { run_async(config).await })
}

/// Async entry point: wire emitters and hooks, then wait for shutdown.
async fn run_async(config: Config) -> Result<()> {
    let shutdown = &config.shutdown;
    let emitter: Emitter = if shutdown.force_on_second_signal {
        KillerSignalEmitter::new(shutdown.signals.clone()).into()
    } else {
        SignalEmitter::new(shutdown.signals.clone()).into()
    };

    let dispatcher = Dispatcher::builder()
        .reason_handler(handler::log())
        .emitter(emitter)
        .build();

    if let Some(timeout) = shutdown.timeout {
        info!(timeout = %humantime::format_duration(timeout), "shutdown timeout armed on stop");
        dispatcher.register_callback_with_priority(TimeoutGuard::new(timeout).into(), i32::MAX);
    }

    for hook in &config.hooks {
        let Some(command) = CommandHook::from_config(hook) else {
            bail!("hook '{}' has no command", hook.name);
        };
        info!(
            name = %hook.name,
            priority = hook.priority,
            command = %hook.command.join(" "),
            "configured hook"
        );
        let callback: Callback = command.into();
        dispatcher.register_callback_with_priority(callback, hook.priority);
    }

    info!("stopd is running");

    match dispatcher.wait(&CancellationToken::new()).await {
        Ok(()) => {
            info!("shutdown complete");
            Ok(())
        }
        Err(errors) => {
            for err in errors.iter() {
                error!(error = %err, "shutdown hook failed");
            }
            bail!("{} shutdown hook(s) failed:\n{}", errors.len(), errors)
        }
    }
}
