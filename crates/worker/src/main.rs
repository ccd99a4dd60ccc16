mod cli;
mod commands;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use renderfarm_core::{
    load_config, validate_config, BlenderRenderer, Config, LoggingConfig, Renderer,
};

use cli::{Cli, Command};
use logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging settings live in the config file, so a broken config is
    // reported with the default subscriber.
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!("Failed to load config from {:?}: {}", cli.config, e);
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);

    if let Err(e) = run(cli, config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    // Resolve executables once; nothing below may run without them.
    let executables = validate_config(&config).context("Configuration validation failed")?;
    info!(
        "Using renderer {:?} (secondary available: {})",
        executables.primary(),
        executables.secondary_available()
    );

    let renderer: Arc<dyn Renderer> =
        Arc::new(BlenderRenderer::new(executables, config.renderer.clone()));
    let variant = cli.variant();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Devices => commands::devices(renderer.as_ref(), variant, &mut stdout).await,
        Command::Probe { file } => {
            commands::probe(renderer.as_ref(), &file, variant, &mut stdout).await
        }
        Command::Render(args) => {
            let job = args.into_job(variant);
            info!("Rendering {:?} ({:?})", job.file, job.params.mode);

            // Dropping the render kills the renderer process.
            tokio::select! {
                result = commands::render(renderer.as_ref(), job, &mut stdout) => result,
                _ = shutdown_signal() => {
                    warn!("Interrupted, stopping renderer");
                    anyhow::bail!("Render interrupted")
                }
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
