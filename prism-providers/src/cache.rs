//! Enhancement cache
//!
//! Memoizes enhanced prompts by the SHA-256 of the normalized prompt.
//! Bounded by capacity (oldest insertion evicted first) and a TTL. The lock
//! is never held across an await, so concurrent misses for the same prompt
//! may both reach the provider.

use crate::EnhancementProvider;
use prism_core::{prompt_cache_key, PrismError, PrismResult, PromptKey};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 512;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_ENHANCE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    enhanced: String,
    created_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<PromptKey, CacheEntry>,
    /// Insertion order. Stale `(key, seq)` pairs are skipped on eviction.
    order: VecDeque<(PromptKey, u64)>,
    next_seq: u64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Expired entries returned because the provider failed.
    pub stale_served: u64,
    pub entry_count: u64,
    pub capacity: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub enhanced: String,
    /// True when no provider call was made.
    pub cached: bool,
}

pub struct EnhancementCache {
    inner: RwLock<CacheInner>,
    capacity: usize,
    ttl: Duration,
    enhance_timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    stale_served: AtomicU64,
}

impl Default for EnhancementCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl EnhancementCache {
    /// Capacity is at least one entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            capacity: capacity.max(1),
            ttl,
            enhance_timeout: DEFAULT_ENHANCE_TIMEOUT,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
        }
    }

    /// Bound on a single provider call.
    pub fn with_enhance_timeout(mut self, timeout: Duration) -> Self {
        self.enhance_timeout = timeout;
        self
    }

    /// Return the enhanced prompt, calling the provider only on a miss.
    ///
    /// Fails only when the provider fails and no entry, fresh or expired,
    /// exists for the prompt.
    pub async fn get_or_enhance(
        &self,
        provider: &dyn EnhancementProvider,
        prompt: &str,
    ) -> PrismResult<CacheLookup> {
        let key = prompt_cache_key(prompt);

        let stale = match self.lookup(&key) {
            Lookup::Fresh(enhanced) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(model = provider.model_id(), "enhancement cache hit");
                return Ok(CacheLookup {
                    enhanced,
                    cached: true,
                });
            }
            Lookup::Expired(enhanced) => {
                self.expirations.fetch_add(1, Ordering::Relaxed);
                Some(enhanced)
            }
            Lookup::Missing => None,
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        let result = match tokio::time::timeout(self.enhance_timeout, provider.enhance(prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(PrismError::Enhancement {
                reason: format!(
                    "{} did not answer within {}s",
                    provider.model_id(),
                    self.enhance_timeout.as_secs_f64()
                ),
            }),
        };

        match result {
            Ok(enhanced) => {
                self.insert(key, enhanced.clone());
                Ok(CacheLookup {
                    enhanced,
                    cached: false,
                })
            }
            Err(err) => match stale {
                Some(enhanced) => {
                    warn!(error = %err, "enhancement failed, serving expired cache entry");
                    self.stale_served.fetch_add(1, Ordering::Relaxed);
                    Ok(CacheLookup {
                        enhanced,
                        cached: true,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Fresh cached value for a prompt, without touching counters.
    pub fn peek(&self, prompt: &str) -> Option<String> {
        match self.lookup(&prompt_cache_key(prompt)) {
            Lookup::Fresh(enhanced) => Some(enhanced),
            _ => None,
        }
    }

    fn lookup(&self, key: &PromptKey) -> Lookup {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                Lookup::Fresh(entry.enhanced.clone())
            }
            Some(entry) => Lookup::Expired(entry.enhanced.clone()),
            None => Lookup::Missing,
        }
    }

    fn insert(&self, key: PromptKey, enhanced: String) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            CacheEntry {
                enhanced,
                created_at: Instant::now(),
                seq,
            },
        );
        inner.order.push_back((key, seq));

        while inner.entries.len() > self.capacity {
            let Some((oldest, oldest_seq)) = inner.order.pop_front() else {
                break;
            };
            let current = inner.entries.get(&oldest).map(|e| e.seq);
            if current == Some(oldest_seq) {
                inner.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        // Re-inserted keys leave stale order records behind.
        if inner.order.len() > self.capacity * 2 {
            let CacheInner { entries, order, .. } = &mut *inner;
            order.retain(|(k, s)| entries.get(k).map(|e| e.seq) == Some(*s));
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
            capacity: self.capacity as u64,
        }
    }
}

enum Lookup {
    Fresh(String),
    Expired(String),
    Missing,
}

impl std::fmt::Debug for EnhancementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("current_size", &self.len())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EnhancementProvider for Counting {
        fn model_id(&self) -> &str {
            "counting"
        }

        async fn enhance(&self, prompt: &str) -> PrismResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(PrismError::Enhancement {
                    reason: "down".into(),
                });
            }
            Ok(format!("enhanced: {}", prompt))
        }
    }

    #[tokio::test]
    async fn test_hit_skips_provider() {
        let cache = EnhancementCache::new(8, DEFAULT_TTL);
        let provider = Counting::default();

        let first = cache.get_or_enhance(&provider, "a cat").await.unwrap();
        assert!(!first.cached);
        let second = cache.get_or_enhance(&provider, "  A   CAT ").await.unwrap();
        assert!(second.cached);
        assert_eq!(second.enhanced, first.enhanced);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_fifo_eviction() {
        let cache = EnhancementCache::new(2, DEFAULT_TTL);
        let provider = Counting::default();
        for p in ["one", "two", "three"] {
            cache.get_or_enhance(&provider, p).await.unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.peek("one").is_none());
        assert!(cache.peek("two").is_some());
        assert!(cache.peek("three").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_refetches() {
        let cache = EnhancementCache::new(8, Duration::from_secs(60));
        let provider = Counting::default();

        cache.get_or_enhance(&provider, "sunset").await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        let again = cache.get_or_enhance(&provider, "sunset").await.unwrap();
        assert!(!again.cached);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_served_when_provider_fails() {
        let cache = EnhancementCache::new(8, Duration::from_secs(60));
        let provider = Counting::default();
        cache.get_or_enhance(&provider, "sunset").await.unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;
        provider.fail.store(true, Ordering::SeqCst);
        let lookup = cache.get_or_enhance(&provider, "sunset").await.unwrap();
        assert_eq!(lookup.enhanced, "enhanced: sunset");
        assert_eq!(cache.stats().stale_served, 1);
    }

    #[tokio::test]
    async fn test_failure_without_entry_propagates() {
        let cache = EnhancementCache::new(8, DEFAULT_TTL);
        let provider = Counting::default();
        provider.fail.store(true, Ordering::SeqCst);
        let err = cache.get_or_enhance(&provider, "sunset").await.unwrap_err();
        assert!(matches!(err, PrismError::Enhancement { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout() {
        let cache = EnhancementCache::new(8, DEFAULT_TTL)
            .with_enhance_timeout(Duration::from_secs(1));
        let provider = Counting {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let err = cache.get_or_enhance(&provider, "slow").await.unwrap_err();
        assert!(err.to_string().contains("did not answer"));
    }

    #[tokio::test]
    async fn test_reinsert_does_not_grow_order_unbounded() {
        let cache = Arc::new(EnhancementCache::new(2, Duration::ZERO));
        let provider = Counting::default();
        for _ in 0..20 {
            cache.get_or_enhance(&provider, "same").await.unwrap();
        }
        assert_eq!(cache.len(), 1);
        let inner = cache.inner.read().unwrap();
        assert!(inner.order.len() <= 4);
    }
}
