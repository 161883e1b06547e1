use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use blobstore::{ObjectStore, S3Store};
use tracing::{info, warn};

use minio_bridge::{app, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    // --- Startup health checks (fail fast) ---
    if cfg.health_check {
        check_minio_http(&cfg.s3_endpoint).await?;
        info!(endpoint = %cfg.s3_endpoint, "minio: ok (http health)");
    } else {
        warn!("minio health check disabled");
    }

    // --- S3 (MinIO) ---
    let store = S3Store::new(&cfg.s3_settings());
    store
        .ensure_bucket(&cfg.files_bucket)
        .await
        .with_context(|| format!("failed to prepare bucket {}", cfg.files_bucket))?;
    info!(bucket = %cfg.files_bucket, "resource bucket ready");

    if !store.bucket_exists(&cfg.firmware_bucket).await.unwrap_or(false) {
        warn!(bucket = %cfg.firmware_bucket, "firmware bucket missing, firmware writes will fail until it exists");
    }

    let addr = cfg.bind_addr.clone();
    let state = Arc::new(AppState::new(Arc::new(store), cfg));
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("minio-bridge listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("minio-bridge stopped");
    Ok(())
}

async fn check_minio_http(base: &str) -> Result<()> {
    let url = format!("{}/minio/health/live", base.trim_end_matches('/'));
    let resp = reqwest::get(&url).await.context("MinIO health request failed")?;
    if resp.status() != StatusCode::OK {
        anyhow::bail!("MinIO unhealthy: HTTP {}", resp.status());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
