use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wallet_scanner::config::ScanConfig;
use wallet_scanner::health::HealthChecker;
use wallet_scanner::oracle::NodeRpcClient;
use wallet_scanner::prometheus_metrics::PrometheusMetrics;
use wallet_scanner::scanner::Scanner;
use wallet_scanner::server::StatusServer;
use wallet_scanner::types::ScanState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ScanConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    // The blocking reqwest client must not be built on a runtime thread.
    let scanner = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Scanner> {
            let oracle =
                NodeRpcClient::new(&config).context("failed to build node rpc client")?;
            Ok(Scanner::new(config, Arc::new(oracle)))
        })
        .await
        .context("scanner build task panicked")??
    };
    let scanner = Arc::new(scanner);
    info!(instance = %scanner.identity().instance_id, "scanner initialized");

    let health = Arc::new(HealthChecker::new(Arc::clone(&scanner)));
    let prometheus = Arc::new(PrometheusMetrics::new());
    let server = StatusServer::new(
        Arc::clone(&scanner),
        Arc::clone(&health),
        prometheus,
        config.status_port,
    );
    tokio::spawn(async move {
        if let Err(e) = server.start().await {
            error!(error = %e, "status server exited");
        }
    });

    {
        let scanner = Arc::clone(&scanner);
        tokio::task::spawn_blocking(move || scanner.start())
            .await
            .context("start task panicked")??;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                let scanner = Arc::clone(&scanner);
                if let Ok(snapshot) =
                    tokio::task::spawn_blocking(move || scanner.snapshot()).await
                {
                    info!(
                        state = %snapshot.state,
                        total = snapshot.total_scanned,
                        hits = snapshot.hits,
                        cpu_per_min = snapshot.cpu_rate_per_min as u64,
                        gpu_per_min = snapshot.gpu_rate_per_min as u64,
                        queue = snapshot.queue_depth,
                        "scan progress"
                    );
                    if snapshot.state == ScanState::Failed {
                        error!(error = ?snapshot.last_error, "session failed, exiting");
                        break;
                    }
                }
            }
        }
    }

    let stopper = Arc::clone(&scanner);
    tokio::task::spawn_blocking(move || stopper.stop())
        .await
        .context("stop task panicked")?;
    info!("scanner shut down cleanly");
    Ok(())
}
