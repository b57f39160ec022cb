//! news-collector: binary entrypoint.
//! Wires config, store, collector loop and (optionally) the read API.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_collector::{
    api::{self, AppState},
    collector::{Collector, CollectorHandle, CollectorSettings},
    config::{AppConfig, Environment, DEV_API_KEY},
    digest,
    ingest::{registry::load_feeds_default, RssFetcher},
    lang::WhatlangDetector,
    metrics::Metrics,
    open_store,
    store::{ListQuery, NewsStore},
    translate::build_translator,
};

#[derive(Debug, Parser)]
#[command(name = "news-collector", version, about = "Collects RSS news into a rolling SQLite window")]
struct Cli {
    /// Run a single collection cycle and exit.
    #[arg(long, visible_alias = "refresh")]
    once: bool,

    /// Seconds between cycles (overrides REFRESH_INTERVAL).
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Serve the read API alongside the collector.
    #[arg(long)]
    serve: bool,

    /// Serve the API only; do not collect.
    #[arg(long, conflicts_with = "once")]
    no_collect: bool,

    /// Print a digest of stored items after each cycle (ignored in production).
    #[arg(long)]
    show: bool,

    /// Feed registry file (TOML or JSON), overrides FEEDS_PATH.
    #[arg(long, value_name = "PATH")]
    feeds: Option<PathBuf>,
}

/// `RUST_LOG` wins; otherwise a per-environment default. `LOG_FORMAT=json` for JSON lines.
fn init_tracing(environment: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(environment.default_log_filter()));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing(Environment::detect());

    let cli = Cli::parse();
    let mut cfg = AppConfig::load().context("loading configuration")?;
    if let Some(secs) = cli.interval {
        cfg.refresh_interval_secs = secs;
    }
    if let Some(path) = cli.feeds.clone() {
        cfg.feeds_path = Some(path);
    }
    cfg.sanitize().context("validating configuration")?;

    let show = cli.show && cfg.environment == Environment::Development;
    if cli.show && !show {
        warn!("--show is disabled in production");
    }

    let feeds = load_feeds_default(cfg.feeds_path.as_deref()).context("loading feed registry")?;
    info!(
        environment = ?cfg.environment,
        feeds = feeds.len(),
        interval_secs = cfg.refresh_interval_secs,
        max_age_hours = cfg.max_age_hours,
        target = %cfg.target_language,
        "starting news-collector"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        termination_signal().await;
        shutdown_tx.send_replace(true);
    });

    let Some(store) = open_store_with_retry(&cfg, cli.once, shutdown_rx.clone()).await? else {
        return Ok(());
    };

    let translator = build_translator(&cfg.translator, &cfg.target_language)
        .context("building translator")?;
    let fetcher = RssFetcher::http(cfg.fetch_timeout()).context("building HTTP client")?;
    let collector = Arc::new(Collector::new(
        feeds.clone(),
        Arc::new(fetcher),
        Arc::new(WhatlangDetector),
        translator,
        store.clone(),
        CollectorSettings::from_config(&cfg),
    ));

    if cli.once {
        let report = collector.run_once_until(shutdown_rx.clone()).await;
        if show {
            print_digest(&store, cfg.max_age_hours).await;
        }
        info!(inserted = report.inserted, evicted = report.evicted, "single cycle done");
        store.close().await;
        return Ok(());
    }

    let mut handle = CollectorHandle::new(collector.clone());
    if !cli.no_collect {
        if show {
            spawn_digest_printer(&collector, store.clone(), cfg.max_age_hours);
        }
        handle.start();
    }

    if cli.serve || cli.no_collect {
        let state = AppState::new(store.clone(), collector.status(), cfg.clone(), feeds);
        let mut app = api::router(state);
        match Metrics::init() {
            Ok(m) => app = app.merge(m.router()),
            Err(e) => warn!(error = %e, "metrics exporter not installed"),
        }
        match cfg.api.api_key.as_deref() {
            None => error!("API_KEY not set; protected routes will answer 503"),
            Some(DEV_API_KEY) => warn!("using the built-in development API key"),
            Some(_) => {}
        }

        let addr = ("0.0.0.0", cfg.api.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding port {}", cfg.api.port))?;
        info!(port = cfg.api.port, "read API listening");
        let mut rx = shutdown_rx.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.wait_for(|stop| *stop).await;
            })
            .await
            .context("serving read API")?;
    } else {
        let mut rx = shutdown_rx.clone();
        let _ = rx.wait_for(|stop| *stop).await;
    }

    handle.stop().await;
    store.close().await;
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM. A handler that cannot be installed never fires.
async fn termination_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending().await
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let signal = tokio::select! {
        s = ctrl_c => s,
        s = terminate => s,
    };
    info!(signal, "shutdown requested");
}

/// Keep trying every refresh interval until a store opens, unless `once` or shutdown.
async fn open_store_with_retry(
    cfg: &AppConfig,
    once: bool,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<Option<NewsStore>> {
    loop {
        match open_store(cfg).await {
            Ok(store) => return Ok(Some(store)),
            Err(e) if once => return Err(e).context("opening store"),
            Err(e) => {
                error!(error = %e, retry_in_secs = cfg.refresh_interval_secs, "store unavailable");
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cfg.refresh_interval_secs)) => {}
            _ = shutdown.wait_for(|stop| *stop) => return Ok(None),
        }
    }
}

fn spawn_digest_printer(collector: &Collector, store: NewsStore, max_age_hours: u64) {
    let mut reports = collector.status().subscribe();
    tokio::spawn(async move {
        while reports.changed().await.is_ok() {
            print_digest(&store, max_age_hours).await;
        }
    });
}

async fn print_digest(store: &NewsStore, max_age_hours: u64) {
    match store.list(&ListQuery::default()).await {
        Ok(items) => println!("{}", digest::render(&items, max_age_hours)),
        Err(e) => warn!(error = %e, "could not read items for digest"),
    }
}
