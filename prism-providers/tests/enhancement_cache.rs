//! Enhancement cache against the shared mock enhancer.

use prism_providers::EnhancementCache;
use prism_test_utils::MockEnhancementProvider;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_sequential_identical_prompts_call_provider_once() {
    let cache = EnhancementCache::new(64, Duration::from_secs(3600));
    let provider = MockEnhancementProvider::new();

    for variant in ["a red fox", "A red fox", "  a  red   fox ", "A RED FOX"] {
        let lookup = cache.get_or_enhance(&provider, variant).await.unwrap();
        assert_eq!(lookup.enhanced, "Enhanced: a red fox");
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(cache.stats().hits, 3);
}

#[tokio::test]
async fn test_distinct_prompts_each_call_provider() {
    let cache = EnhancementCache::new(64, Duration::from_secs(3600));
    let provider = MockEnhancementProvider::new();
    for prompt in ["a fox", "a cat", "a fox", "a cat", "a dog"] {
        cache.get_or_enhance(&provider, prompt).await.unwrap();
    }
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_concurrent_misses_are_not_collapsed_but_then_cached() {
    let cache = Arc::new(EnhancementCache::new(64, Duration::from_secs(3600)));
    let provider = Arc::new(MockEnhancementProvider::new().with_delay(Duration::from_millis(50)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(async move {
            cache.get_or_enhance(provider.as_ref(), "sunset").await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().enhanced, "Enhanced: sunset");
    }
    let concurrent_calls = provider.calls();
    assert!((1..=8).contains(&concurrent_calls));

    let lookup = cache.get_or_enhance(provider.as_ref(), "sunset").await.unwrap();
    assert!(lookup.cached);
    assert_eq!(provider.calls(), concurrent_calls);
}

#[tokio::test]
async fn test_hit_does_not_wait_on_slow_provider() {
    let cache = EnhancementCache::new(64, Duration::from_secs(3600));
    let provider = MockEnhancementProvider::new().with_delay(Duration::from_millis(200));
    cache.get_or_enhance(&provider, "slow prompt").await.unwrap();

    let started = std::time::Instant::now();
    let lookup = cache.get_or_enhance(&provider, "slow prompt").await.unwrap();
    assert!(lookup.cached);
    assert!(started.elapsed() < Duration::from_millis(100));
}
