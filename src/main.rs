use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use payment_bridge as bridge;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = bridge::config::load_config().context("failed to load configuration")?;
    bridge::config::init_tracing(cfg.log_level(), cfg.log_json);

    if !cfg.is_production() {
        warn!(environment = %cfg.environment, "Running outside production");
    }
    info!(
        projects = cfg.ctp_projects.len(),
        merchant_accounts = cfg.adyen_merchant_accounts.len(),
        "Configured integrations"
    );

    let cfg = Arc::new(cfg);
    let payments = bridge::build_payment_handler(Arc::clone(&cfg))
        .context("failed to build payment pipeline")?;
    let app = bridge::handlers::router(bridge::handlers::AppState::new(Arc::clone(&cfg), payments));

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("payment-bridge listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("payment-bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received");
}
