//! Exponential backoff around catalog calls.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use ndvi_common::{ImageDescriptor, RasterImage};
use tracing::{instrument, warn};

use crate::catalog::{CatalogQuery, RasterCatalog};
use crate::error::{CatalogError, Result};

/// Backoff settings for transient catalog failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each retry).
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Exhausted transient failures become [`CatalogError::Unavailable`];
    /// permanent failures are returned on first occurrence.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    return Err(CatalogError::Unavailable {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation,
                        error = %e,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Catalog call failed, retrying"
                    );
                    counter!("ndvi_catalog_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Catalog wrapper that retries transient failures of the inner catalog.
pub struct RetryingCatalog<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: RasterCatalog> RetryingCatalog<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: RasterCatalog> RasterCatalog for RetryingCatalog<C> {
    #[instrument(skip(self, query), fields(max_cloud_pct = query.max_cloud_pct))]
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ImageDescriptor>> {
        self.policy.run("query", || self.inner.query(query)).await
    }

    #[instrument(skip(self, image, bands), fields(image = %image.id))]
    async fn load_bands(&self, image: &ImageDescriptor, bands: &[&str]) -> Result<RasterImage> {
        self.policy
            .run("load_bands", || self.inner.load_bands(image, bands))
            .await
    }
}
