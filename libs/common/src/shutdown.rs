//! Process shutdown signals

use std::fmt;
use std::future::pending;

use tracing::warn;

/// Signal that ended the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM, e.g. from systemd or docker stop
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

/// Resolve with the first shutdown signal the process receives
///
/// A signal whose handler cannot be installed is logged and never fires;
/// the other one still does.
pub async fn wait_for_shutdown() -> ShutdownSignal {
    tokio::select! {
        signal = interrupt() => signal,
        signal = terminate() => signal,
    }
}

async fn interrupt() -> ShutdownSignal {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ShutdownSignal::Interrupt,
        Err(e) => {
            warn!("Ctrl+C handler unavailable: {}", e);
            pending().await
        },
    }
}

#[cfg(unix)]
async fn terminate() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
            ShutdownSignal::Terminate
        },
        Err(e) => {
            warn!("SIGTERM handler unavailable ({}), Ctrl+C only", e);
            pending().await
        },
    }
}

#[cfg(not(unix))]
async fn terminate() -> ShutdownSignal {
    pending().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_names() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn test_pending_without_signal() {
        let waited = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown()).await;
        assert!(waited.is_err());
    }
}
