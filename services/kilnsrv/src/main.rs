//! Kiln Controller Service (kilnsrv)

use std::sync::Arc;

use axum::serve;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use common::shutdown::wait_for_shutdown;
use errors::{KilnError, KilnResult};
use kilnsrv::{
    api::create_router,
    bootstrap::{self, Args},
    AppState, SamplingRecorder,
};

#[tokio::main]
async fn main() -> KilnResult<()> {
    let args = Args::parse();
    let config = bootstrap::load_config(&args)?;
    let _log_guard = common::init_logging(&config.logging)?;

    if args.validate {
        info!("Validation completed successfully");
        return Ok(());
    }

    info!(
        "Starting kilnsrv v{} ({:?} mode)",
        env!("CARGO_PKG_VERSION"),
        config.device.mode
    );

    let device = bootstrap::build_device(&config)?;
    let recorder = Arc::new(SamplingRecorder::new(
        device.clone(),
        config.recording.path.clone(),
        config.recording.interval(),
    ));
    if config.recording.autostart {
        recorder.start().await?;
    }

    let shutdown_token = CancellationToken::new();
    let server_handle = if config.api.enabled {
        let addr = config.api.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| KilnError::io(format!("Failed to bind {}: {}", addr, e)))?;
        let app = create_router(AppState {
            device,
            recorder: Arc::clone(&recorder),
        });

        info!("API server listening on http://{}", addr);
        info!("Health check: http://{}/health", addr);

        let server = serve(listener, app);
        let server_token = shutdown_token.clone();
        Some(tokio::spawn(async move {
            let shutdown = async move { server_token.cancelled().await };
            if let Err(e) = server.with_graceful_shutdown(shutdown).await {
                error!("Server error: {}", e);
            }
        }))
    } else {
        info!("API server disabled");
        None
    };

    let signal = wait_for_shutdown().await;
    info!("{} received, shutting down", signal);

    recorder.shutdown().await;
    shutdown_token.cancel();
    if let Some(handle) = server_handle {
        if let Err(e) = handle.await {
            error!("Server task failed: {}", e);
        }
    }

    info!("kilnsrv stopped");
    Ok(())
}
