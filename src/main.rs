//! channel-ticker - NACHO market metrics as Discord channel names

use anyhow::{Context, Result};
use channel_ticker::{
    config::{self, Config, RefreshPlan},
    cycle::preview_labels,
    ChannelPublisher, DiscordClient, MetricFetcher, RefreshCycle,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// Config file picked up from the working directory when --config is absent
const DEFAULT_CONFIG_FILE: &str = "channel-ticker.toml";

#[derive(Parser, Debug)]
#[command(name = "channel-ticker", version, about = "Publish NACHO market metrics as Discord channel names")]
struct Cli {
    /// Log at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to Discord and keep channel names up to date
    Run(RunCmd),
    /// Fetch every metric and print the labels without publishing
    Probe(ProbeCmd),
}

#[derive(Args, Debug)]
struct RunCmd {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

#[derive(Args, Debug)]
struct ProbeCmd {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets live in .env, not in the config file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(cmd) => run_command(cmd, cli.verbose, cli.debug).await,
        Command::Probe(cmd) => probe_command(cmd, cli.verbose, cli.debug).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{:#}", e), "Fatal error");
    }
    result
}

fn init_logging(verbose: bool, debug: bool, config_level: &str) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
    };

    fmt().with_env_filter(filter).init();
}

/// Resolve the config path: explicit flag, else the default file if present
fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let default = Path::new(DEFAULT_CONFIG_FILE);
        default.exists().then(|| default.to_path_buf())
    })
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let path = config_path(cmd.config);
    let config = config::load_unvalidated(path.as_deref()).context("Failed to load configuration")?;
    init_logging(verbose, debug, &config.logging.level);
    config.validate().context("Invalid configuration")?;

    tracing::info!(config = ?path, "Starting channel ticker");

    let token = config::discord_token()?;
    let discord = DiscordClient::connect_to(&config.discord.api_url, &token)
        .await
        .context("Failed to log in to Discord")?;

    let cycle = build_cycle(&config, discord)?;

    if cmd.once {
        if let Some(outcome) = cycle.run_pass().await {
            tracing::info!("{}", outcome);
        }
    } else {
        cycle.run(shutdown_signal()).await;
    }

    tracing::info!("Channel ticker stopped");
    Ok(())
}

fn build_cycle(config: &Config, discord: DiscordClient) -> Result<RefreshCycle> {
    let fetcher = MetricFetcher::new(config.fetch_settings()).context("Failed to create HTTP client")?;
    Ok(RefreshCycle::new(
        Arc::new(fetcher),
        ChannelPublisher::new(Arc::new(discord)),
        RefreshPlan::from(config),
    ))
}

async fn probe_command(cmd: ProbeCmd, verbose: bool, debug: bool) -> Result<()> {
    let path = config_path(cmd.config);
    let config = config::load_unvalidated(path.as_deref()).context("Failed to load configuration")?;
    init_logging(verbose, debug, &config.logging.level);
    config.validate_settings().context("Invalid configuration")?;

    let fetcher = MetricFetcher::new(config.fetch_settings()).context("Failed to create HTTP client")?;
    let plan = RefreshPlan::from(&config);

    for (target, label) in preview_labels(&fetcher, &plan).await {
        println!(
            "{:<12} {}",
            target.role.name(),
            label.as_deref().unwrap_or("(unavailable)")
        );
    }

    let metrics = fetcher.get_fetch_metrics().await;
    println!(
        "\n{} attempts, {:.0}% ok, p50={:.0}ms, p99={:.0}ms",
        metrics.total_attempts,
        metrics.success_rate * 100.0,
        metrics.latency_p50_ms,
        metrics.latency_p99_ms
    );
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
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
    tracing::info!("Shutdown signal received");
}
