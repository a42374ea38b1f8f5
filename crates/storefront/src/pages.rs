//! Generated-page cache with timed revalidation and on-demand fallback.
//!
//! Pages are generated from Stripe data and kept in memory. A page older than
//! the revalidation window is still served, while a single background task
//! regenerates it (stale-while-revalidate). Two lookup modes exist:
//!
//! - [`PageCache::get_or_generate`] generates a missing page inline; concurrent
//!   callers share one generation.
//! - [`PageCache::get_or_fallback`] never waits: a missing page starts a
//!   background generation and the caller renders a loading placeholder.
//!
//! Failed generations are remembered for a short time ([`FAILURE_TTL`] in the
//! storefront) so that fallback requests surface the error instead of showing
//! the placeholder forever, and so that a failing provider is not retried on
//! every request.
//!
//! Generated pages are never evicted: a page only exists for an ID the
//! provider returned, so the set is bounded by the catalog. Failures are keyed
//! by whatever visitors request and are capped at [`MAX_TRACKED_FAILURES`].

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::{debug, error};

/// How long a failed generation is reported before it is attempted again.
pub const FAILURE_TTL: Duration = Duration::from_secs(30);

/// Maximum number of failed keys remembered at once.
pub const MAX_TRACKED_FAILURES: u64 = 10_000;

/// Result of a non-blocking lookup.
#[derive(Debug)]
pub enum Fallback<V, E> {
    /// The page is available (possibly stale, with revalidation started).
    Ready(Arc<V>),
    /// Generation is in progress; render a placeholder.
    Loading,
    /// The last generation failed recently.
    Failed(Arc<E>),
}

struct Generated<V> {
    value: Arc<V>,
    generated_at: Instant,
}

impl<V> Clone for Generated<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            generated_at: self.generated_at,
        }
    }
}

impl<V> Generated<V> {
    fn new(value: Arc<V>) -> Self {
        Self {
            value,
            generated_at: Instant::now(),
        }
    }

    fn is_stale(&self, window: Duration) -> bool {
        self.generated_at.elapsed() >= window
    }
}

/// Cache of generated pages keyed by string.
pub struct PageCache<V, E> {
    inner: Arc<PageCacheInner<V, E>>,
}

struct PageCacheInner<V, E> {
    name: &'static str,
    revalidate: Duration,
    pages: Cache<String, Generated<V>>,
    failures: Cache<String, Arc<E>>,
    in_flight: Mutex<HashSet<String>>,
}

impl<V, E> Clone for PageCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Removes a key from the in-flight set when the generation task ends,
/// including when it panics.
struct InFlightGuard<V, E> {
    cache: PageCache<V, E>,
    key: String,
}

impl<V, E> Drop for InFlightGuard<V, E> {
    fn drop(&mut self) {
        self.cache
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl<V, E> PageCache<V, E>
where
    V: Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    /// Create a cache whose pages go stale after `revalidate` and whose
    /// generation failures are reported for `failure_ttl`.
    #[must_use]
    pub fn new(name: &'static str, revalidate: Duration, failure_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(PageCacheInner {
                name,
                revalidate,
                pages: Cache::builder().build(),
                failures: Cache::builder()
                    .max_capacity(MAX_TRACKED_FAILURES)
                    .time_to_live(failure_ttl)
                    .build(),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Return the page, generating it inline if it has never been generated.
    ///
    /// # Errors
    ///
    /// Returns the generation error if the page is missing and generating it
    /// fails. Stale pages are always returned; their revalidation errors are
    /// only logged.
    pub async fn get_or_generate<F, Fut>(&self, key: &str, generate: F) -> Result<Arc<V>, Arc<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(page) = self.inner.pages.get(key).await {
            if page.is_stale(self.inner.revalidate) {
                self.revalidate_in_background(key, generate);
            }
            return Ok(page.value);
        }

        let page = self
            .inner
            .pages
            .try_get_with(key.to_owned(), async move {
                generate().await.map(|value| Generated::new(Arc::new(value)))
            })
            .await
            .inspect_err(|err| {
                error!(cache = self.inner.name, key, error = %err, "Page generation failed");
            })?;

        Ok(page.value)
    }

    /// Return the page if available, otherwise start generating it.
    pub async fn get_or_fallback<F, Fut>(&self, key: &str, generate: F) -> Fallback<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(page) = self.inner.pages.get(key).await {
            if page.is_stale(self.inner.revalidate) {
                self.revalidate_in_background(key, generate);
            }
            return Fallback::Ready(page.value);
        }

        if let Some(err) = self.inner.failures.get(key).await {
            return Fallback::Failed(err);
        }

        self.spawn_generation(key, generate);
        Fallback::Loading
    }

    /// Generate a page now and store it, replacing any existing copy.
    ///
    /// # Errors
    ///
    /// Returns the generation error; nothing is stored in that case.
    pub async fn prerender<F, Fut>(&self, key: &str, generate: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let value = generate().await?;
        self.store(key, Arc::new(value)).await;
        debug!(cache = self.inner.name, key, "Page pre-rendered");
        Ok(())
    }

    /// Whether a page is currently stored for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.pages.contains_key(key)
    }

    async fn store(&self, key: &str, value: Arc<V>) {
        self.inner.failures.invalidate(key).await;
        self.inner
            .pages
            .insert(key.to_owned(), Generated::new(value))
            .await;
    }

    fn revalidate_in_background<F, Fut>(&self, key: &str, generate: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        // Keep serving the stale copy while the provider is failing.
        if self.inner.failures.contains_key(key) {
            return;
        }
        debug!(cache = self.inner.name, key, "Revalidating stale page");
        self.spawn_generation(key, generate);
    }

    /// Run `generate` on the runtime unless a generation for `key` is running.
    fn spawn_generation<F, Fut>(&self, key: &str, generate: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let newly_started = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned());
        if !newly_started {
            return;
        }

        let guard = InFlightGuard {
            cache: self.clone(),
            key: key.to_owned(),
        };

        tokio::spawn(async move {
            let cache = &guard.cache;
            match generate().await {
                Ok(value) => {
                    cache.store(&guard.key, Arc::new(value)).await;
                    debug!(cache = cache.inner.name, key = %guard.key, "Page generated");
                }
                Err(err) => {
                    error!(
                        cache = cache.inner.name,
                        key = %guard.key,
                        error = %err,
                        "Background page generation failed"
                    );
                    cache
                        .inner
                        .failures
                        .insert(guard.key.clone(), Arc::new(err))
                        .await;
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;

    const HOURS_2: Duration = Duration::from_secs(7200);

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = Result<usize, String>> + use<> {
        let counter = Arc::clone(counter);
        async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
    }

    /// Poll until the cached page satisfies `predicate`.
    async fn wait_for(cache: &PageCache<usize, String>, key: &str, predicate: impl Fn(usize) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(page) = cache.inner.pages.get(key).await
                    && predicate(*page.value)
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_generates_once_within_window() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, FAILURE_TTL);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        let first = cache.get_or_generate("k", move || counting(&c)).await.unwrap();
        let c = Arc::clone(&counter);
        let second = cache.get_or_generate("k", move || counting(&c)).await.unwrap();

        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inline_generation_error_is_returned() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, FAILURE_TTL);
        let err = cache
            .get_or_generate("k", || async { Err("provider down".to_string()) })
            .await
            .unwrap_err();

        assert_eq!(err.as_str(), "provider down");
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn test_stale_page_is_served_while_revalidating() {
        let cache = PageCache::<usize, String>::new("test", Duration::ZERO, FAILURE_TTL);
        cache.prerender("k", || async { Ok(1) }).await.unwrap();

        let stale = cache
            .get_or_generate("k", || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(*stale, 1);

        wait_for(&cache, "k", |v| v == 2).await;
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_stale_page() {
        let cache = PageCache::<usize, String>::new("test", Duration::ZERO, FAILURE_TTL);
        cache.prerender("k", || async { Ok(1) }).await.unwrap();

        let page = cache
            .get_or_generate("k", || async { Err("boom".to_string()) })
            .await
            .unwrap();
        assert_eq!(*page, 1);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !cache.inner.failures.contains_key("k") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let page = cache.get_or_fallback("k", || async { Ok(3) }).await;
        assert!(matches!(page, Fallback::Ready(v) if *v == 1));
    }

    #[tokio::test]
    async fn test_fallback_renders_loading_then_ready() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, FAILURE_TTL);

        let first = cache.get_or_fallback("k", || async { Ok(7) }).await;
        assert!(matches!(first, Fallback::Loading));

        wait_for(&cache, "k", |v| v == 7).await;

        let second = cache.get_or_fallback("k", || async { Ok(8) }).await;
        assert!(matches!(second, Fallback::Ready(v) if *v == 7));
    }

    #[tokio::test]
    async fn test_fallback_shares_in_flight_generation() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, FAILURE_TTL);
        let counter = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            let release = Arc::clone(&release);
            let lookup = cache
                .get_or_fallback("k", move || async move {
                    release.notified().await;
                    Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
                })
                .await;
            assert!(matches!(lookup, Fallback::Loading));
        }

        release.notify_waiters();
        release.notify_one();
        wait_for(&cache, "k", |v| v == 1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_reported() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, FAILURE_TTL);

        let first = cache
            .get_or_fallback("k", || async { Err("No such product".to_string()) })
            .await;
        assert!(matches!(first, Fallback::Loading));

        let failed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Fallback::Failed(err) =
                    cache.get_or_fallback("k", || async { Ok(1) }).await
                {
                    return err;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(failed.as_str(), "No such product");
    }

    #[tokio::test]
    async fn test_failure_expires_and_generation_retries() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, Duration::from_millis(50));

        cache
            .get_or_fallback("k", || async { Err("provider down".to_string()) })
            .await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cache.inner.failures.contains_key("k") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let failed = cache.get_or_fallback("k", || async { Ok(1) }).await;
        assert!(matches!(failed, Fallback::Failed(_)));

        tokio::time::sleep(Duration::from_millis(100)).await;

        let retried = cache.get_or_fallback("k", || async { Ok(2) }).await;
        assert!(matches!(retried, Fallback::Loading));

        wait_for(&cache, "k", |v| v == 2).await;
        let ready = cache.get_or_fallback("k", || async { Ok(3) }).await;
        assert!(matches!(ready, Fallback::Ready(v) if *v == 2));
    }

    #[tokio::test]
    async fn test_generated_pages_are_not_evicted() {
        let cache = PageCache::<usize, String>::new("test", HOURS_2, FAILURE_TTL);

        for i in 0..2_000 {
            cache.prerender(&format!("prod_{i}"), || async move { Ok(i) }).await.unwrap();
        }
        cache.inner.pages.run_pending_tasks().await;

        assert_eq!(cache.inner.pages.entry_count(), 2_000);
        for i in 0..2_000 {
            let page = cache.get_or_fallback(&format!("prod_{i}"), || async { Ok(0) }).await;
            assert!(matches!(page, Fallback::Ready(v) if *v == i));
        }
    }
}
