//! Bound on concurrent outbound fetches.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Semaphore-backed fetch limiter; a limit of zero means unlimited.
#[derive(Debug, Clone)]
pub struct FetchLimiter {
    permits: Option<Arc<Semaphore>>,
}

impl FetchLimiter {
    pub fn new(limit: usize) -> Self {
        Self {
            permits: (limit > 0).then(|| Arc::new(Semaphore::new(limit))),
        }
    }

    /// Wait for a fetch slot. The slot is released when the permit drops.
    /// Unlimited limiters return `None` immediately.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permits = self.permits.clone()?;
        permits.acquire_owned().await.ok()
    }

    /// Free slots, `None` when unlimited.
    pub fn available(&self) -> Option<usize> {
        self.permits.as_ref().map(|p| p.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unlimited() {
        let limiter = FetchLimiter::new(0);
        assert!(limiter.acquire().await.is_none());
        assert_eq!(limiter.available(), None);
    }

    #[tokio::test]
    async fn test_limit_blocks_until_release() {
        let limiter = FetchLimiter::new(1);
        let held = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), Some(0));

        let blocked = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(blocked.is_err());

        drop(held);
        assert!(limiter.acquire().await.is_some());
    }
}
