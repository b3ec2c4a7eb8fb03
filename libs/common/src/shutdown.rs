//! Graceful shutdown utilities
//!
//! Signal handling shared by the console binaries. The link itself only
//! understands a [`CancellationToken`]; this module bridges OS signals onto it.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for shutdown signal (Ctrl+C or SIGTERM on Unix)
///
/// - On Unix: Ctrl+C (SIGINT) or SIGTERM
/// - On Windows: Ctrl+C only
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!("SIGTERM handler unavailable ({}), Ctrl+C only", e);
                None
            },
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                match term_signal.as_mut() {
                    Some(sig) => {
                        sig.recv().await;
                    },
                    None => std::future::pending::<()>().await,
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Cancel `token` when a shutdown signal arrives
///
/// The listener also exits quietly if the token is cancelled by someone else
/// first (e.g. a one-shot `send` finishing on its own).
///
/// ```ignore
/// let token = CancellationToken::new();
/// let _listener = common::shutdown::cancel_on_shutdown(token.clone());
/// ```
pub fn cancel_on_shutdown(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = wait_for_shutdown() => {
                info!("Shutdown signal received");
                token.cancel();
            },
            () = token.cancelled() => {},
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_exits_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let listener = cancel_on_shutdown(token.clone());

        token.cancel();
        let joined = tokio::time::timeout(std::time::Duration::from_secs(1), listener).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
