//! Process-wide shutdown request.
//!
//! The interrupt handler is installed once and latches into a watch channel,
//! so a Ctrl-C that arrives while a turn is in flight is not lost.

use std::future::Future;

use tokio::sync::watch;
use tracing::{info, warn};

/// Latch `signal` into a flag that every later waiter observes.
pub fn spawn_listener<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        signal.await;
        info!("Shutdown requested");
        let _ = tx.send(true);
    });
    rx
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Wait until shutdown has been requested.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        // Listener gone without a request: nothing left to wait for.
        std::future::pending::<()>().await;
    }
}
