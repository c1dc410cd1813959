use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::{AppState, router};
use crate::service::AcquisitionService;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Serve the API and drain the download queue every `poll_interval` until a
/// shutdown signal arrives. The queue is flushed to the store on the way out.
pub async fn run(service: AcquisitionService, address: SocketAddr) -> Result<(), AnyError> {
    let app = router(AppState::new(service.clone()));

    let (stop_tx, stop_rx) = watch::channel(false);
    let poller = tokio::spawn(poll_queue(service.clone(), stop_rx));

    let listener = TcpListener::bind(address).await?;
    info!(%address, "courtfetch API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(true);
    if let Err(e) = poller.await {
        warn!(error = %e, "Queue poller ended abnormally");
    }

    let persisted = service.persist_queue()?;
    info!(persisted, "Queue flushed, shutting down");
    Ok(())
}

async fn poll_queue(service: AcquisitionService, mut stop: watch::Receiver<bool>) {
    let discovery = &service.context().config.discovery;
    if !discovery.enabled {
        info!("Discovery disabled, queue poller idle");
        return;
    }
    let batch_size = discovery.batch_size;
    let period = discovery.poll_interval().max(Duration::from_secs(1));

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(interval_secs = period.as_secs(), batch_size, "Queue poller started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match service.process_batch(batch_size).await {
                    Ok(report) if report.processed > 0 => info!(
                        processed = report.processed,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        total_cost = %report.total_cost,
                        "Scheduled batch finished"
                    ),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Scheduled batch failed"),
                }
            }
            _ = stop.changed() => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
