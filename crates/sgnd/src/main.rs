//! sgnd: the SGN node daemon. Wires config, storage, lifecycle, and the
//! HTTP/WebSocket control plane together, then drains on signal.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sgn_events::EventFrame;
use sgn_outbox::Scheduler;

use sgnd::config::Config;
use sgnd::shutdown::ShutdownScope;
use sgnd::state::{self, now_ms, SharedState};
use sgnd::http;

const OUTBOX_POLL_INTERVAL: Duration = Duration::from_millis(500);
const OUTBOX_BATCH_SIZE: i64 = 32;
const HEALTH_BROADCAST_INTERVAL: Duration = Duration::from_secs(1);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(err) = config.validate() {
        eprintln!("invalid configuration: {err}");
        return ExitCode::FAILURE;
    }

    let _logging_guard = match sgnd::logging::init(&config.logs_dir()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "sgnd exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let state = state::AppState::open(config).await?;
    let shutdown = ShutdownScope::new();

    let outbox_task = spawn_outbox_scheduler(state.clone(), shutdown.subscribe());
    let health_task = spawn_health_broadcaster(state.clone(), shutdown.subscribe());

    let app = http::router(state.clone());
    let addr = format!("0.0.0.0:{}", state.config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "sgnd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    tracing::info!("shutdown signal received, draining background tasks");
    shutdown.trigger();

    let drain = async {
        let _ = outbox_task.await;
        let _ = health_task.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!("background tasks did not drain within grace window, forcing exit");
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sig) = signal(SignalKind::terminate()) {
            sig.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn spawn_outbox_scheduler(
    state: SharedState,
    shutdown: tokio::sync::broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let scheduler = Scheduler::new(
        state.outbox.clone(),
        OUTBOX_POLL_INTERVAL,
        OUTBOX_BATCH_SIZE,
        state.metrics.clone(),
    );
    let broker = state.broker.clone();

    let send: sgn_outbox::Sender = Box::new(move |entry| {
        let broker = broker.clone();
        let cid = entry
            .payload
            .get("cid")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let ku_type = entry
            .payload
            .get("ku_type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Box::pin(async move {
            broker.publish(EventFrame::Ku {
                cid,
                ku_type,
                trusted: true,
            });
            Ok(())
        })
    });

    tokio::spawn(async move {
        scheduler.run(shutdown, send, now_ms).await;
    })
}

fn spawn_health_broadcaster(
    state: SharedState,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEALTH_BROADCAST_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outbox_ready = state.outbox.counts().await.map(|c| c.pending).unwrap_or(0);
                    state.metrics.set_outbox_ready(outbox_ready);
                    state.metrics.set_ws_clients(state.broker.subscriber_count());
                    state.broker.publish(EventFrame::Health {
                        status: "healthy".to_string(),
                        outbox_ready,
                        ts_ms: now_ms(),
                    });
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}
