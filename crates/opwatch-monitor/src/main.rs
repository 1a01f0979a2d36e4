//! Live monitoring binary.
//!
//! Loads a reference procedure from a JSON file, then replays a directory of
//! JPEG frames through a live session at 1 fps, printing progress snapshots
//! and alerts as they arrive. Ctrl-C stops the session early.
//!
//! Usage: opwatch-monitor <procedure.json> <frames-dir>

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opwatch_engine::{MonitorConfig, MonitorContext, SessionMonitor};
use opwatch_media::FfmpegEncoder;
use opwatch_models::{MonitorEvent, ReferenceProcedure};
use opwatch_oracle::GeminiClient;
use opwatch_store::{MemoryStore, ProcedureRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("opwatch=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
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
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("usage: opwatch-monitor <procedure.json> <frames-dir>");
    }
    let procedure_path = PathBuf::from(&args[1]);
    let frames_dir = PathBuf::from(&args[2]);

    info!("Starting opwatch-monitor");

    let procedure_json = tokio::fs::read_to_string(&procedure_path)
        .await
        .with_context(|| format!("failed to read {}", procedure_path.display()))?;
    let procedure: ReferenceProcedure =
        serde_json::from_str(&procedure_json).context("invalid procedure definition")?;
    let procedure_id = procedure.procedure_id.clone();

    let store = Arc::new(MemoryStore::new());
    ProcedureRepository::create(store.as_ref(), &procedure).await?;

    let oracle = GeminiClient::new().context("oracle client init failed")?;
    let ctx = Arc::new(MonitorContext {
        oracle: Arc::new(oracle),
        encoder: Arc::new(FfmpegEncoder::new()),
        procedures: store.clone(),
        sessions: store.clone(),
        alerts: store.clone(),
    });

    let operator_id =
        std::env::var("OPWATCH_OPERATOR_ID").unwrap_or_else(|_| "operator".to_string());
    let config = MonitorConfig::from_env();

    let mut monitor = SessionMonitor::start(&procedure_id, &operator_id, config, ctx).await?;
    info!("Session {} started", monitor.session_id());

    // Print live updates as they arrive
    let mut events = monitor.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(MonitorEvent::Snapshot(snapshot)) => {
                    info!(
                        "frames {}-{}: step {}/{} '{}' (detected: {:?}, match: {})",
                        snapshot.start_frame,
                        snapshot.end_frame,
                        snapshot.current_step_index + 1,
                        snapshot.all_steps.len(),
                        snapshot.current_step_name,
                        snapshot.detected_step_index.map(|i| i + 1),
                        snapshot.matches_expected,
                    );
                }
                Ok(MonitorEvent::Alert(alert)) => {
                    warn!(
                        "[{}] {}: {}",
                        alert.severity.as_str(),
                        alert.alert_type.as_str(),
                        alert.message
                    );
                }
                Ok(MonitorEvent::Stopped { frames_processed, .. }) => {
                    info!("Session stopped after {} frames", frames_processed);
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event printer lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Replay frames at the 1 fps sampling rate
    let mut frame_paths: Vec<PathBuf> = std::fs::read_dir(&frames_dir)
        .with_context(|| format!("failed to read {}", frames_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
                .unwrap_or(false)
        })
        .collect();
    frame_paths.sort();

    if frame_paths.is_empty() {
        bail!("no JPEG frames found in {}", frames_dir.display());
    }
    info!("Replaying {} frames from {}", frame_paths.len(), frames_dir.display());

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut remaining = frame_paths.into_iter();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                match remaining.next() {
                    Some(path) => match tokio::fs::read(&path).await {
                        Ok(frame) => monitor.ingest_frame(frame),
                        Err(e) => error!("Failed to read frame {}: {}", path.display(), e),
                    },
                    None => {
                        info!("All frames ingested; draining");
                        // Give the worker a moment to finish queued chunks
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        break;
                    }
                }
            }
        }
    }

    monitor.stop().await?;
    printer.await.ok();

    info!("Monitor shutdown complete");
    Ok(())
}
