use crate::services::token_cache::DownloadTokenCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Periodically evict expired download tokens until `shutdown` flips.
pub async fn run(
    cache: Arc<DownloadTokenCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                tracing::info!("Token sweeper shutting down");
                return;
            }
        }

        let removed = cache.sweep();
        if removed > 0 {
            tracing::info!(
                count = removed,
                remaining = cache.len(),
                "Token sweep completed"
            );
        }
    }
}

/// Owns a running sweeper task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn spawn(cache: Arc<DownloadTokenCache>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(cache, interval, shutdown_rx));
        Self { shutdown_tx, task }
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Token sweeper task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweeper_evicts_expired_tokens() {
        let cache = Arc::new(DownloadTokenCache::new(chrono::Duration::milliseconds(20)));
        let token = cache.issue("/a").unwrap();

        let sweeper = SweeperHandle::spawn(cache.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!cache.contains(&token));
        sweeper.stop().await;
    }

    #[tokio::test]
    async fn test_sweeper_stops_promptly() {
        let cache = Arc::new(DownloadTokenCache::new(chrono::Duration::minutes(5)));
        let token = cache.issue("/a").unwrap();

        let sweeper = SweeperHandle::spawn(cache.clone(), Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(1), sweeper.stop())
            .await
            .expect("sweeper did not stop");

        assert!(cache.contains(&token));
    }
}
