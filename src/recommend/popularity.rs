//! Lazily refreshed popularity normalization
//!
//! The popularity dimension normalizes a tender's raw popularity score
//! against a rolling 95th percentile over published tenders. The percentile
//! is expensive to compute, so it is cached and refreshed lazily. A failed
//! refresh keeps serving the previous value.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;

use crate::database::Database;

struct Cached {
    p95: f64,
    refreshed_at: Instant,
}

pub struct PopularityIndex {
    db: Arc<Database>,
    ttl: Duration,
    cached: RwLock<Option<Cached>>,
}

impl PopularityIndex {
    pub fn new(db: Arc<Database>, ttl: Duration) -> Self {
        Self {
            db,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current 95th-percentile popularity. Returns 0.0 when no value has
    /// ever been computed and the refresh fails, which disables the
    /// popularity dimension rather than failing the request.
    pub async fn p95(&self) -> f64 {
        {
            let cached = self.cached.read().await;
            if let Some(c) = cached.as_ref() {
                if c.refreshed_at.elapsed() < self.ttl {
                    return c.p95;
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(c) = cached.as_ref() {
            if c.refreshed_at.elapsed() < self.ttl {
                return c.p95;
            }
        }

        match self.db.popularity_p95().await {
            Ok(p95) => {
                debug!("Refreshed popularity p95: {}", p95);
                *cached = Some(Cached {
                    p95,
                    refreshed_at: Instant::now(),
                });
                p95
            }
            Err(e) => {
                warn!("Failed to refresh popularity p95: {}", e);
                cached.as_ref().map(|c| c.p95).unwrap_or(0.0)
            }
        }
    }
}

/// Normalize a raw popularity score into [0, 1].
pub fn normalize_popularity(popularity: f64, p95: f64) -> f32 {
    if p95 <= 0.0 || popularity <= 0.0 {
        return 0.0;
    }
    (popularity / p95).min(1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_popularity_caps_at_one() {
        assert_eq!(normalize_popularity(500.0, 100.0), 1.0);
        assert!((normalize_popularity(50.0, 100.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_popularity_without_percentile() {
        assert_eq!(normalize_popularity(50.0, 0.0), 0.0);
        assert_eq!(normalize_popularity(0.0, 100.0), 0.0);
    }
}
