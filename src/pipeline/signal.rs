/// Resolve on the first termination signal.
///
/// - **Unix:** SIGINT, SIGTERM and SIGHUP (Termux sends SIGHUP when its session closes).
/// - **Other:** Ctrl+C.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (sigint, sigterm, sighup) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    );

    match (sigint, sigterm, sighup) {
        (Ok(mut sigint), Ok(mut sigterm), Ok(mut sighup)) => {
            tokio::select! {
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sighup.recv() => tracing::info!("Received SIGHUP signal"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
