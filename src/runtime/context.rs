//! # Run Context
//!
//! Cooperative stop signal shared by the retry loop, the backoff sleeps and
//! the HTTP server. Nothing inside the launcher ever triggers it on its own:
//! in production only SIGINT/SIGTERM do, in tests the test does.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a stop was requested
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }

    /// Sleep for `duration` unless a stop is requested first.
    ///
    /// Returns `true` when the full duration elapsed, `false` when the sleep
    /// was cut short.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.token.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    /// Spawn a task the launcher cannot run without. If it fails, the error
    /// is logged and this context is stopped so the retry loop winds down;
    /// the error stays in the returned handle.
    pub fn spawn_critical<F, T>(&self, name: &'static str, task: F) -> JoinHandle<anyhow::Result<T>>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = self.clone();
        tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = &result {
                error!(task = name, "Critical task failed, stopping: {:#}", e);
                ctx.stop();
            }
            result
        })
    }

    /// Spawn a task that stops this context on SIGINT or SIGTERM
    pub fn stop_on_signal(&self) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Received shutdown signal (SIGINT/SIGTERM), stopping retry loop...");
            ctx.stop();
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
