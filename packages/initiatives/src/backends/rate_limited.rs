//! Rate-limited backend wrapper.
//!
//! Wraps any [`ReasoningBackend`] with client-side rate limiting using the
//! governor crate, so a large analysis run does not trip provider limits
//! in the first place.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};

use crate::error::BackendResult;
use crate::traits::{ExtractionRequest, RawAnswer, RawInitiative, RawInsight, ReasoningBackend};
use crate::types::Outlook;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A backend wrapper that enforces a request rate across all call kinds.
pub struct RateLimitedBackend<B: ReasoningBackend> {
    inner: B,
    limiter: Arc<DefaultRateLimiter>,
}

impl<B: ReasoningBackend> RateLimitedBackend<B> {
    /// Wrap a backend with a sustained requests-per-second limit.
    pub fn new(backend: B, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        );
        Self {
            inner: backend,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wrap with a custom quota.
    pub fn with_quota(backend: B, quota: Quota) -> Self {
        Self {
            inner: backend,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wrap with burst support.
    pub fn with_burst(backend: B, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        )
        .allow_burst(NonZeroU32::new(burst).expect("burst must be > 0"));
        Self {
            inner: backend,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<B: ReasoningBackend> ReasoningBackend for RateLimitedBackend<B> {
    async fn extract_initiatives(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInitiative>> {
        self.wait_for_permit().await;
        self.inner.extract_initiatives(request).await
    }

    async fn classify_outlook(&self, name: &str, quote: &str) -> BackendResult<Outlook> {
        self.wait_for_permit().await;
        self.inner.classify_outlook(name, quote).await
    }

    async fn extract_insights(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInsight>> {
        self.wait_for_permit().await;
        self.inner.extract_insights(request).await
    }

    async fn answer(
        &self,
        question: &str,
        company_name: &str,
        contexts: &[String],
    ) -> BackendResult<RawAnswer> {
        self.wait_for_permit().await;
        self.inner.answer(question, company_name, contexts).await
    }

    async fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        self.wait_for_permit().await;
        self.inner.embed(text).await
    }
}

/// Extension trait for easy rate limiting.
pub trait BackendExt: ReasoningBackend + Sized {
    /// Wrap this backend with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedBackend<Self> {
        RateLimitedBackend::new(self, requests_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(
        self,
        requests_per_second: u32,
        burst: u32,
    ) -> RateLimitedBackend<Self> {
        RateLimitedBackend::with_burst(self, requests_per_second, burst)
    }
}

impl<B: ReasoningBackend + Sized> BackendExt for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limiting_spaces_out_calls() {
        let backend = MockBackend::new().rate_limited(2);

        let start = Instant::now();
        for _ in 0..3 {
            backend.embed("some text").await.unwrap();
        }
        let elapsed = start.elapsed();

        // 3 calls at 2/sec: first immediate, the rest wait.
        assert!(
            elapsed.as_millis() >= 500,
            "rate limiting not applied: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_extension_trait() {
        let _backend = MockBackend::new().rate_limited_with_burst(5, 10);
    }
}
