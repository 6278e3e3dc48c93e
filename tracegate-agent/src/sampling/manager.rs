use crate::metrics::ConfigManagerMetrics;
use async_trait::async_trait;
use prometheus::IntCounter;
use std::sync::Arc;
use tracegate_model::strategy::SamplingStrategyResponse;

/// Per-service cap on a baggage key propagated out-of-band. Only the legacy
/// framed-TCP transport serves these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaggageRestriction {
    pub baggage_key: String,
    pub max_value_length: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigManagerError {
    #[error("collector query failed: {0}")]
    Upstream(String),
    #[error("{0} is not available over this transport")]
    NotImplemented(&'static str),
}

/// What the agent asks the collector on behalf of clients. Implementations
/// are pass-through: caching, if any, is the caller's concern.
#[async_trait]
pub trait ClientConfigManager: Send + Sync {
    async fn get_sampling_strategy(
        &self,
        service_name: &str,
    ) -> Result<SamplingStrategyResponse, ConfigManagerError>;

    async fn get_baggage_restrictions(
        &self,
        service_name: &str,
    ) -> Result<Vec<BaggageRestriction>, ConfigManagerError>;
}

/// Decorator counting queries under `{endpoint, result}`.
pub struct MetricsConfigManager {
    inner: Arc<dyn ClientConfigManager>,
    sampling_ok: IntCounter,
    sampling_err: IntCounter,
    baggage_ok: IntCounter,
    baggage_err: IntCounter,
}

impl MetricsConfigManager {
    pub fn new(inner: Arc<dyn ClientConfigManager>, metrics: &ConfigManagerMetrics) -> Self {
        Self {
            inner,
            sampling_ok: metrics.ok("sampling"),
            sampling_err: metrics.err("sampling"),
            baggage_ok: metrics.ok("baggage"),
            baggage_err: metrics.err("baggage"),
        }
    }
}

#[async_trait]
impl ClientConfigManager for MetricsConfigManager {
    async fn get_sampling_strategy(
        &self,
        service_name: &str,
    ) -> Result<SamplingStrategyResponse, ConfigManagerError> {
        let result = self.inner.get_sampling_strategy(service_name).await;
        match &result {
            Ok(_) => self.sampling_ok.inc(),
            Err(_) => self.sampling_err.inc(),
        }
        result
    }

    async fn get_baggage_restrictions(
        &self,
        service_name: &str,
    ) -> Result<Vec<BaggageRestriction>, ConfigManagerError> {
        let result = self.inner.get_baggage_restrictions(service_name).await;
        match &result {
            Ok(_) => self.baggage_ok.inc(),
            Err(_) => self.baggage_err.inc(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct StubManager {
        fail: bool,
    }

    #[async_trait]
    impl ClientConfigManager for StubManager {
        async fn get_sampling_strategy(
            &self,
            _service_name: &str,
        ) -> Result<SamplingStrategyResponse, ConfigManagerError> {
            if self.fail {
                Err(ConfigManagerError::Upstream("down".to_string()))
            } else {
                Ok(SamplingStrategyResponse::probabilistic(0.1))
            }
        }

        async fn get_baggage_restrictions(
            &self,
            _service_name: &str,
        ) -> Result<Vec<BaggageRestriction>, ConfigManagerError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn counts_ok_and_err_results() {
        let registry = prometheus::Registry::new();
        let metrics = ConfigManagerMetrics::new(&registry).unwrap();
        let ok_manager =
            MetricsConfigManager::new(Arc::new(StubManager { fail: false }), &metrics);
        let err_manager =
            MetricsConfigManager::new(Arc::new(StubManager { fail: true }), &metrics);

        ok_manager.get_sampling_strategy("svc").await.unwrap();
        ok_manager.get_sampling_strategy("svc").await.unwrap();
        err_manager.get_sampling_strategy("svc").await.unwrap_err();

        assert_eq!(metrics.ok("sampling").get(), 2);
        assert_eq!(metrics.err("sampling").get(), 1);
    }
}
