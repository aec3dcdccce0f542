//! Process signals -> cancellation token.
//!
//! First SIGINT/SIGTERM cancels the token; the scan loop notices at its next
//! poll point and stops after the current cycle. A second signal terminates
//! the process without waiting.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit status used when a second signal aborts an in-flight cycle.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Watch real process signals for the lifetime of the runtime.
pub fn spawn_signal_watcher(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(watch(token, stop_signal, || {
        std::process::exit(EXIT_INTERRUPTED);
    }))
}

/// Cancel `token` on the first signal, call `escalate` on the second.
pub async fn watch<S, Fut, E>(token: CancellationToken, mut next_signal: S, escalate: E)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    E: FnOnce(),
{
    next_signal().await;
    tracing::info!("stop requested; finishing current cycle (signal again to abort)");
    token.cancel();

    next_signal().await;
    tracing::warn!("second stop signal; terminating immediately");
    escalate();
}

async fn stop_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; Ctrl+C only");
                ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}
