//! Two-layer report cache with request coalescing.
//!
//! Durable layer: a keyed Postgres table with TTL (`report_cache`). Memory
//! layer: a bounded map consulted when Postgres is absent or unavailable.
//! Cache failures are logged and degrade to misses — the cache is an
//! optimization, never a correctness dependency.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use croscope_common::AnalysisReport;

/// Memory-layer capacity. Insertions beyond this are dropped, not evicted.
const MEMORY_CAP: usize = 100;

/// Cache key for a normalized URL: hex SHA-256.
pub fn cache_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

struct MemoryEntry {
    report: AnalysisReport,
    expires_at: DateTime<Utc>,
}

pub struct ReportCache {
    pool: Option<PgPool>,
    ttl: Duration,
    memory: Mutex<HashMap<String, MemoryEntry>>,
    /// key → in-flight computation. The only structure mutated by multiple
    /// concurrent callers; guarded by an atomic check-and-insert.
    inflight: Mutex<HashMap<String, Arc<OnceCell<AnalysisReport>>>>,
}

impl ReportCache {
    pub fn new(pool: Option<PgPool>, ttl: Duration) -> Self {
        Self {
            pool,
            ttl,
            memory: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Create the durable cache table.
    pub async fn migrate(pool: &PgPool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS report_cache (
                cache_key   TEXT         PRIMARY KEY,
                url         TEXT         NOT NULL,
                report      JSONB        NOT NULL,
                created_at  TIMESTAMPTZ  NOT NULL DEFAULT now(),
                expires_at  TIMESTAMPTZ  NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Look up a cached report. Missing, expired, or erroring lookups all
    /// return None.
    pub async fn get(&self, url: &str) -> Option<AnalysisReport> {
        let key = cache_key(url);

        if let Some(pool) = &self.pool {
            match self.get_durable(pool, &key).await {
                Ok(Some(report)) => {
                    debug!(url, "Durable cache hit");
                    return Some(report);
                }
                Ok(None) => {}
                Err(e) => warn!(url, error = %e, "Durable cache read failed, trying memory"),
            }
        }

        let mut memory = self.memory.lock().unwrap_or_else(|p| p.into_inner());
        match memory.get(&key) {
            Some(entry) if entry.expires_at > Utc::now() => {
                debug!(url, "Memory cache hit");
                Some(entry.report.clone())
            }
            Some(_) => {
                memory.remove(&key);
                None
            }
            None => None,
        }
    }

    async fn get_durable(&self, pool: &PgPool, key: &str) -> Result<Option<AnalysisReport>> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT report FROM report_cache
             WHERE cache_key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Store a report under its URL key. Best-effort on both layers.
    pub async fn put(&self, url: &str, report: &AnalysisReport) {
        let key = cache_key(url);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(24));

        {
            let mut memory = self.memory.lock().unwrap_or_else(|p| p.into_inner());
            if memory.len() < MEMORY_CAP || memory.contains_key(&key) {
                memory.insert(
                    key.clone(),
                    MemoryEntry {
                        report: report.clone(),
                        expires_at,
                    },
                );
            }
        }

        if let Some(pool) = &self.pool {
            if let Err(e) = self.put_durable(pool, &key, url, report, expires_at).await {
                warn!(url, error = %e, "Durable cache write failed");
            }
        }
    }

    async fn put_durable(
        &self,
        pool: &PgPool,
        key: &str,
        url: &str,
        report: &AnalysisReport,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO report_cache (cache_key, url, report, expires_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (cache_key)
             DO UPDATE SET report = EXCLUDED.report,
                           expires_at = EXCLUDED.expires_at,
                           created_at = now()",
        )
        .bind(key)
        .bind(url)
        .bind(serde_json::to_value(report)?)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Drop any cached report for a URL.
    pub async fn invalidate(&self, url: &str) {
        let key = cache_key(url);

        self.memory
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&key);

        if let Some(pool) = &self.pool {
            if let Err(e) = sqlx::query("DELETE FROM report_cache WHERE cache_key = $1")
                .bind(&key)
                .execute(pool)
                .await
            {
                warn!(url, error = %e, "Durable cache invalidation failed");
            }
        }
    }

    /// Run `compute` with singleflight semantics: concurrent calls for the
    /// same URL execute it exactly once and all receive a clone of the same
    /// report. A failed computation caches nothing; the next caller retries.
    pub async fn get_or_compute<F, Fut>(&self, url: &str, compute: F) -> Result<AnalysisReport>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisReport>>,
    {
        let key = cache_key(url);

        let cell = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        // Retire the in-flight entry once settled, including when this
        // future is dropped mid-computation (deadline cancellation). A
        // waiter that outlives the retirement still completes through its
        // own Arc clone of the cell.
        let _retire = RetireGuard {
            inflight: &self.inflight,
            key,
            cell: cell.clone(),
        };

        cell.get_or_try_init(compute).await.map(Clone::clone)
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

struct RetireGuard<'a> {
    inflight: &'a Mutex<HashMap<String, Arc<OnceCell<AnalysisReport>>>>,
    key: String,
    cell: Arc<OnceCell<AnalysisReport>>,
}

impl Drop for RetireGuard<'_> {
    // Only removes its own cell: a concurrent retirement may already have
    // installed a newer one under the same key.
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = inflight.get(&self.key) {
            if Arc::ptr_eq(existing, &self.cell) {
                inflight.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_report;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_cache(ttl: Duration) -> ReportCache {
        ReportCache::new(None, ttl)
    }

    #[test]
    fn identical_urls_map_to_identical_keys() {
        assert_eq!(cache_key("https://a.example/"), cache_key("https://a.example/"));
        assert_ne!(cache_key("https://a.example/"), cache_key("https://b.example/"));
    }

    #[tokio::test]
    async fn memory_put_then_get_roundtrips() {
        let cache = memory_cache(Duration::from_secs(60));
        let report = sample_report("https://shop.example/");

        cache.put("https://shop.example/", &report).await;
        let cached = cache.get("https://shop.example/").await.unwrap();
        assert_eq!(cached.id, report.id);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = memory_cache(Duration::from_secs(0));
        let report = sample_report("https://shop.example/");

        cache.put("https://shop.example/", &report).await;
        assert!(cache.get("https://shop.example/").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = memory_cache(Duration::from_secs(60));
        let report = sample_report("https://shop.example/");

        cache.put("https://shop.example/", &report).await;
        cache.invalidate("https://shop.example/").await;
        assert!(cache.get("https://shop.example/").await.is_none());
    }

    #[tokio::test]
    async fn memory_layer_rejects_insertions_over_cap() {
        let cache = memory_cache(Duration::from_secs(60));
        for i in 0..MEMORY_CAP {
            let url = format!("https://shop.example/{i}");
            cache.put(&url, &sample_report(&url)).await;
        }

        cache
            .put("https://overflow.example/", &sample_report("https://overflow.example/"))
            .await;
        assert!(cache.get("https://overflow.example/").await.is_none());

        // Existing keys still update in place.
        let updated = sample_report("https://shop.example/0");
        cache.put("https://shop.example/0", &updated).await;
        let cached = cache.get("https://shop.example/0").await.unwrap();
        assert_eq!(cached.id, updated.id);
    }

    #[tokio::test]
    async fn concurrent_callers_coalesce_to_one_computation() {
        let cache = Arc::new(memory_cache(Duration::from_secs(60)));
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("https://shop.example/", || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(sample_report("https://shop.example/"))
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut reports = Vec::new();
        for handle in handles {
            reports.push(handle.await.unwrap());
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(reports.iter().all(|r| r.id == reports[0].id));
    }

    #[tokio::test]
    async fn cancelled_computation_leaves_no_inflight_entry() {
        let cache = Arc::new(memory_cache(Duration::from_secs(60)));

        let handle = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute("https://slow.example/", || async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(sample_report("https://slow.example/"))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
        assert!(handle.await.is_err());

        assert_eq!(cache.inflight_len(), 0);

        let report = cache
            .get_or_compute("https://slow.example/", || async {
                Ok(sample_report("https://slow.example/"))
            })
            .await
            .unwrap();
        assert_eq!(report.url, "https://slow.example/");
        assert_eq!(cache.inflight_len(), 0);
    }

    #[tokio::test]
    async fn failed_computation_is_retried_by_next_caller() {
        let cache = memory_cache(Duration::from_secs(60));

        let err = cache
            .get_or_compute("https://shop.example/", || async {
                anyhow::bail!("render failed")
            })
            .await;
        assert!(err.is_err());

        let report = cache
            .get_or_compute("https://shop.example/", || async {
                Ok(sample_report("https://shop.example/"))
            })
            .await
            .unwrap();
        assert_eq!(report.url, "https://shop.example/");
    }
}
