//! Reelvault daemon entry point.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelvault_core::executor::ExecutionResult;
use reelvault_core::providers::{AiClient, TmdbClient};
use reelvault_core::web_verify::WebTitleVerifier;
use reelvault_core::{
    CatalogMatcher, Config, DecisionEngine, Executor, FilenameParser, RcloneTransfer, Scanner,
    Store,
};

#[derive(Parser, Debug)]
#[command(name = "reelvault", version, about = "Resolves media release identities and files them by quality")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single scan and exit (the default).
    #[arg(long, conflicts_with = "daemon")]
    once: bool,

    /// Keep scanning at the configured interval until stopped.
    #[arg(long)]
    daemon: bool,

    /// Decide everything but move, delete, and record nothing.
    #[arg(long)]
    dry_run: bool,

    /// Print processing statistics and exit.
    #[arg(long)]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,reqwest=warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Arc::new(
        Config::load(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?,
    );
    let store = Store::open(&config.database.path)
        .await
        .with_context(|| format!("opening database at {}", config.database.path))?;

    if cli.status {
        return print_status(&store).await;
    }

    // Fail fast on bad collaborators before touching any file.
    let transfer = Arc::new(RcloneTransfer::default());
    transfer
        .verify_binary()
        .await
        .context("rclone is required")?;

    let tmdb = Arc::new(TmdbClient::new(
        Config::tmdb_api_key().context("TMDB credentials")?,
        config.tmdb.language.clone(),
        config.tmdb.include_adult,
    ));
    tmdb.verify_auth().await.context("TMDB credentials")?;

    let ai = if config.ai.enabled {
        match Config::ai_api_key() {
            Some(key) => Some(AiClient::new(
                key,
                config.ai.model.clone(),
                config.ai.endpoint.clone(),
            )),
            None => {
                tracing::warn!("AI fallback enabled but OPENAI_API_KEY is not set, disabling");
                None
            }
        }
    } else {
        None
    };

    let parser = FilenameParser::new(
        config.scan.video_extensions.clone(),
        config.parser.fallback_language.clone(),
    );
    let scanner = Scanner::new(
        Arc::clone(&config),
        transfer.clone() as Arc<dyn reelvault_core::FileTransfer>,
        store.clone(),
        parser.clone(),
    );
    let engine = DecisionEngine::new(
        Arc::clone(&config),
        parser,
        CatalogMatcher::new(tmdb),
        WebTitleVerifier::new(),
        ai,
        store.clone(),
    );
    let executor = Executor::new(
        transfer as Arc<dyn reelvault_core::FileTransfer>,
        store.clone(),
        cli.dry_run,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_signal_listener(Arc::clone(&shutdown));

    if cli.daemon {
        run_daemon(&config, &scanner, &engine, &executor, &shutdown).await
    } else {
        if !cli.once {
            tracing::debug!("no mode flag given, defaulting to a single scan");
        }
        run_scan(&scanner, &engine, &executor, &shutdown).await
    }
}

async fn run_scan(
    scanner: &Scanner,
    engine: &DecisionEngine,
    executor: &Executor,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let files = scanner.scan_all().await.context("scanning remotes")?;
    tracing::info!(count = files.len(), "files ready for processing");

    for scanned in files {
        // In-flight files finish; the check happens between files only.
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested, stopping scan");
            break;
        }

        let decision = engine.decide(&scanned.file).await;
        tracing::info!(
            file = %scanned.file,
            action = decision.action.as_str(),
            title = %decision.metadata.title,
            "decision"
        );

        match executor.execute(&decision).await {
            Ok(ExecutionResult::Failed(reason)) => {
                tracing::warn!(file = %scanned.file, reason, "processing failed");
            }
            Ok(result) => {
                tracing::debug!(file = %scanned.file, ?result, "processed");
            }
            Err(e) => {
                tracing::error!(file = %scanned.file, error = %e, "execution error");
            }
        }
    }
    Ok(())
}

async fn run_daemon(
    config: &Config,
    scanner: &Scanner,
    engine: &DecisionEngine,
    executor: &Executor,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let interval_secs = config.scan.interval_minutes * 60;
    tracing::info!(
        interval_minutes = config.scan.interval_minutes,
        "daemon started"
    );

    if config.scan.run_on_startup {
        run_scan(scanner, engine, executor, shutdown).await?;
    }

    while !shutdown.load(Ordering::Relaxed) {
        sleep_interruptible(interval_secs, shutdown).await;
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        run_scan(scanner, engine, executor, shutdown).await?;
    }

    tracing::info!("daemon stopped");
    Ok(())
}

/// Sleep in one-second slices so a shutdown request never waits out a
/// full scan interval.
async fn sleep_interruptible(seconds: u64, shutdown: &AtomicBool) {
    for _ in 0..seconds {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn spawn_signal_listener(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!(error = %e, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                    shutdown.store(true, Ordering::Relaxed);
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received interrupt");
        }
        shutdown.store(true, Ordering::Relaxed);
    });
}

async fn print_status(store: &Store) -> anyhow::Result<()> {
    let counts = store.ledger_counts().await.context("reading ledger")?;
    let qualities = store
        .quality_record_count()
        .await
        .context("reading quality records")?;

    println!("Processed files:");
    if counts.is_empty() {
        println!("  (none)");
    }
    for (status, count) in counts {
        println!("  {status:<20} {count}");
    }
    println!("Quality records:       {qualities}");

    let recent = store.recent_entries(10).await.context("reading ledger")?;
    if !recent.is_empty() {
        println!("\nRecent activity:");
        for entry in recent {
            println!(
                "  [{}] {} -> {} ({})",
                entry.processed_at.format("%Y-%m-%d %H:%M"),
                entry.original_path,
                entry.destination_path.as_deref().unwrap_or("-"),
                entry.status.as_str(),
            );
        }
    }
    Ok(())
}
