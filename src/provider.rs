//! Provider abstraction for reading metrics from upstream APIs

use crate::{metric::MetricSpec, types::MetricResult};
use async_trait::async_trait;

/// Trait for metric providers
///
/// Implementations never fail: a reading that cannot be obtained is returned
/// as an unavailable [`MetricResult`].
#[async_trait]
pub trait MetricProvider: Send + Sync {
    /// Reads one metric
    ///
    /// # Arguments
    /// * `spec` - Endpoint, query and parse step of the metric
    ///
    /// # Returns
    /// The reading, with `value == None` once all attempts are exhausted
    async fn fetch(&self, spec: &MetricSpec) -> MetricResult;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
