use anyhow::{Context, Result};
use rollcall_core::{session, DiskImages, SessionHandle};
use rollcall_hw::CameraStream;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod embedder;

use config::Config;
use dbus_interface::AttendanceService;
use embedder::EmbedderClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "rollcalld starting");

    let identities = Arc::new(config.identities().context("failed to load identity table")?);
    tracing::info!(count = identities.len(), "identity table loaded");

    let conn = zbus::Connection::session()
        .await
        .context("failed to connect to the session bus")?;

    // Camera and model loading start together; sampling waits for both.
    let camera = match CameraStream::start(
        &config.camera_device,
        config.frame_width,
        config.frame_height,
        config.warmup_frames,
    ) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(
                device = %config.camera_device,
                error = %err,
                "camera unavailable; no attendance will be recorded"
            );
            CameraStream::unavailable()
        }
    };

    let analyzer = Arc::new(
        EmbedderClient::connect(&conn, &config.model_uri)
            .await
            .context("failed to create embedding service proxy")?,
    );

    let session = session::start(
        analyzer,
        camera.frames(),
        DiskImages,
        Arc::clone(&identities),
        config.sampler(),
    );

    let service = AttendanceService::new(
        Arc::clone(session.tracker()),
        identities,
        session.readiness_watch(),
        camera.device_path().map(str::to_owned),
    );

    let served = serve(&conn, service).await;
    if served.is_ok() {
        tracing::info!(bus_name = dbus_interface::BUS_NAME, "rollcalld ready");
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to wait for shutdown signal");
        }
    }

    shutdown(session, camera).await;
    served
}

async fn serve(conn: &zbus::Connection, service: AttendanceService) -> Result<()> {
    conn.object_server()
        .at(dbus_interface::OBJECT_PATH, service)
        .await
        .context("failed to register D-Bus interface")?;
    conn.request_name(dbus_interface::BUS_NAME)
        .await
        .context("failed to acquire bus name")?;
    Ok(())
}

/// Single teardown path: stop sampling first, then release the camera.
async fn shutdown(session: SessionHandle, mut camera: CameraStream) {
    tracing::info!("rollcalld shutting down");
    session.shutdown().await;
    if let Err(err) = tokio::task::spawn_blocking(move || camera.stop()).await {
        tracing::error!(error = %err, "camera teardown failed");
    }
}
