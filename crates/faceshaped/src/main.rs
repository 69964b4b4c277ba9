use anyhow::{Context, Result};
use faceshape_core::MeshLandmarker;
use faceshaped::{router, spawn_engine, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "faceshaped starting");

    let config = Config::load().context("loading configuration")?;

    // Load models synchronously so a missing file stops startup.
    let landmarker = MeshLandmarker::load(
        &config.detector_model_path(),
        &config.mesh_model_path(),
        config.mesh_options(),
    )
    .with_context(|| format!("loading models from {}", config.model_dir.display()))?;

    let engine = spawn_engine(Box::new(landmarker))?;
    let app = router(AppState { engine }, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, "faceshaped ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("faceshaped shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
