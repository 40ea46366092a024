use clap::Parser; // for cli
use std::sync::Arc;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use requesty::config::Args;
use requesty::handlers::build_router;
use requesty::metrics::COUNTER_RECORDS;
use requesty::shutdown;
use requesty::snapshot::snapshot_writer;
use requesty::{AppState, CounterStore, MemoryStore};

// open store -> serve -> flush store on shutdown
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::open(args.snapshot_path())?);
    COUNTER_RECORDS.set(store.len() as i64);
    match args.snapshot_path() {
        Some(path) => {
            tracing::info!(path = %path.display(), records = store.len(), "counter store opened")
        }
        None => tracing::info!("counter store running in memory only"),
    }

    // spawn the periodic snapshot flush
    if args.flush_interval > 0 && args.snapshot_path().is_some() {
        let every = Duration::from_secs(args.flush_interval);
        tokio::spawn(snapshot_writer(Arc::clone(&store), every));
    }

    let shutdown = shutdown::install()?;

    let state = Arc::new(AppState::new(Arc::clone(&store)));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("requesty running on http://localhost:{}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let signal = shutdown.wait().await;
            tracing::info!(signal, "shutdown requested");
        })
        .await?;

    store.flush()?;
    tracing::info!(records = store.len(), "counter store flushed, bye");
    Ok(())
}
