//! Highlight worker binary.
//!
//! Usage: `reelcut-worker <manifest.json>...`
//!
//! Each manifest is one run. Runs execute concurrently up to
//! `REELCUT_MAX_CONCURRENT_RUNS`; one JSON report line per run is written to
//! stdout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_worker::manifest::RecordedMoments;
use reelcut_worker::{
    metrics, Collaborators, HighlightPipeline, LabelCaptionWriter, PipelineConfig, RunManifest, RunStore,
    WorkerError,
};

const DEFAULT_LOG_FILTER: &str = "info,reelcut_worker=info,reelcut_media=info,reelcut_storage=info";

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Reports go to stdout, logs to stderr.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let manifests: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if manifests.is_empty() {
        bail!("usage: reelcut-worker <manifest.json>...");
    }

    info!("Starting reelcut-worker");

    let config = PipelineConfig::from_env();
    config.validate()?;
    info!("Pipeline config: {:?}", config);

    if let Ok(addr) = std::env::var("REELCUT_METRICS_ADDR") {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid REELCUT_METRICS_ADDR {:?}", addr))?;
        metrics::install_exporter(addr).context("failed to install Prometheus exporter")?;
        info!(addr = %addr, "Serving metrics");
    }

    let store = config.storage.build().context("failed to configure artifact store")?;
    let runs = Arc::new(RunStore::new());
    let pipeline = HighlightPipeline::new(
        config.clone(),
        Collaborators::new(Arc::new(RecordedMoments(Vec::new())), Arc::new(LabelCaptionWriter)),
        Arc::clone(&runs),
    )
    .with_store(store);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, stopping after the current stages");
            cancel_tx.send(true).ok();
        }
    });

    let eviction = {
        let runs = Arc::clone(&runs);
        let ttl = config.run_ttl;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval((ttl / 2).max(Duration::from_secs(1)));
            loop {
                tick.tick().await;
                let evicted = runs.evict_expired(ttl).await;
                if evicted > 0 {
                    info!(evicted = evicted, "Evicted expired runs");
                }
            }
        })
    };

    let permits = Arc::new(Semaphore::new(config.max_concurrent_runs));
    let mut tasks = JoinSet::new();
    for path in manifests {
        let pipeline = pipeline.clone();
        let permits = Arc::clone(&permits);
        let cancel = cancel_rx.clone();
        tasks.spawn(async move {
            let outcome = async {
                let manifest = RunManifest::load(&path).await?;
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerError::Cancelled("start"))?;
                let request = manifest.request()?;
                pipeline
                    .with_collaborators(manifest.collaborators())
                    .run(request, cancel)
                    .await
            }
            .await;
            (path, outcome)
        });
    }

    let total = tasks.len();
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (path, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!("Run task panicked: {}", e);
                failed += 1;
                continue;
            }
        };

        let line = match outcome {
            Ok(report) => serde_json::to_string(&report)?,
            Err(e) => {
                failed += 1;
                error!(manifest = %path.display(), "Run failed: {}", e);
                serde_json::json!({
                    "manifest": path,
                    "error": e.to_string(),
                    "kind": e.kind(),
                    "retryable": e.is_retryable(),
                })
                .to_string()
            }
        };
        println!("{}", line);
    }

    eviction.abort();
    info!(total = total, failed = failed, "Worker finished");

    if failed > 0 {
        bail!("{} of {} runs failed", failed, total);
    }
    Ok(())
}
