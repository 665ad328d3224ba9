use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Cancellation handle shared by the ingestion loop and whoever stops it.
///
/// The loop checks [`RunContext::is_running`] at each iteration boundary and
/// sleeps through [`RunContext::sleep`], which returns early on cancel.
#[derive(Clone)]
pub struct RunContext {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: Duration) {
        let cancelled = self.wake.notified();
        if !self.is_running() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => {},
            _ = cancelled => {},
        }
    }

    /// Cancel this context on SIGINT/SIGTERM (Ctrl-C on Windows).
    pub fn cancel_on_signal(&self) -> JoinHandle<()> {
        let ctx = self.clone();

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                match (
                    signal(SignalKind::terminate()),
                    signal(SignalKind::interrupt()),
                ) {
                    (Ok(mut sigterm), Ok(mut sigint)) => {
                        tokio::select! {
                            _ = sigterm.recv() => {},
                            _ = sigint.recv() => {},
                        }
                    }
                    _ => {
                        warn!("Failed to install signal handlers; stop with a kill");
                        return;
                    }
                }
            }

            #[cfg(windows)]
            {
                if tokio::signal::ctrl_c().await.is_err() {
                    warn!("Failed to install Ctrl-C handler");
                    return;
                }
            }

            info!("Shutdown requested");
            ctx.cancel();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_stops_running() {
        let ctx = RunContext::new();
        assert!(ctx.is_running());

        let other = ctx.clone();
        other.cancel();
        assert!(!ctx.is_running());
    }

    #[tokio::test]
    async fn test_cancel_wakes_sleeper() {
        let ctx = RunContext::new();
        let sleeper = ctx.clone();

        let handle = tokio::spawn(async move {
            sleeper.sleep(Duration::from_secs(3600)).await;
        });

        tokio::task::yield_now().await;
        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sleep should end on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sleep_after_cancel_returns_immediately() {
        let ctx = RunContext::new();
        ctx.cancel();
        tokio::time::timeout(Duration::from_secs(5), ctx.sleep(Duration::from_secs(3600)))
            .await
            .expect("no sleep once cancelled");
    }
}
