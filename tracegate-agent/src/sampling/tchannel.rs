use super::{BaggageRestriction, ClientConfigManager, ConfigManagerError};
use crate::tchannel::Pool;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracegate_model::strategy::SamplingStrategyResponse;
use tracegate_thrift::calls;

/// Asks the collector over the framed TCP transport; the one transport that
/// also answers baggage restrictions.
pub struct TchannelConfigManager {
    pool: Arc<Pool>,
    service_name: String,
    query_timeout: Duration,
}

impl TchannelConfigManager {
    pub fn new(pool: Arc<Pool>, service_name: impl Into<String>, query_timeout: Duration) -> Self {
        Self {
            pool,
            service_name: service_name.into(),
            query_timeout,
        }
    }
}

#[async_trait]
impl ClientConfigManager for TchannelConfigManager {
    async fn get_sampling_strategy(
        &self,
        service_name: &str,
    ) -> Result<SamplingStrategyResponse, ConfigManagerError> {
        let arg3 = calls::encode_get_sampling_strategy_args(service_name)
            .map_err(|err| ConfigManagerError::Upstream(err.to_string()))?;
        let response = self
            .pool
            .call(
                &self.service_name,
                calls::GET_SAMPLING_STRATEGY,
                arg3.into(),
                self.query_timeout,
            )
            .await
            .map_err(|err| ConfigManagerError::Upstream(err.to_string()))?;
        let strategy = calls::decode_get_sampling_strategy_result(&response)
            .map_err(|err| ConfigManagerError::Upstream(err.to_string()))?;
        Ok(strategy.into_domain())
    }

    async fn get_baggage_restrictions(
        &self,
        service_name: &str,
    ) -> Result<Vec<BaggageRestriction>, ConfigManagerError> {
        let arg3 = calls::encode_get_baggage_restrictions_args(service_name)
            .map_err(|err| ConfigManagerError::Upstream(err.to_string()))?;
        let response = self
            .pool
            .call(
                &self.service_name,
                calls::GET_BAGGAGE_RESTRICTIONS,
                arg3.into(),
                self.query_timeout,
            )
            .await
            .map_err(|err| ConfigManagerError::Upstream(err.to_string()))?;
        let restrictions = calls::decode_get_baggage_restrictions_result(&response)
            .map_err(|err| ConfigManagerError::Upstream(err.to_string()))?;
        Ok(restrictions
            .into_iter()
            .map(|r| BaggageRestriction {
                baggage_key: r.baggage_key,
                max_value_length: r.max_value_length,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::MockCollector;
    use pretty_assertions::assert_eq;
    use tracegate_model::strategy::SamplingStrategyType;
    use tracegate_thrift::sampling;

    #[tokio::test]
    async fn fetches_strategies_from_the_collector() {
        let mock = MockCollector::start(false).await;
        mock.set_strategy(
            "frontend",
            sampling::SamplingStrategyResponse {
                strategy_type: sampling::STRATEGY_TYPE_RATE_LIMITING,
                rate_limiting_sampling: Some(sampling::RateLimitingSamplingStrategy {
                    max_traces_per_second: 42,
                }),
                ..Default::default()
            },
        );
        let pool = Arc::new(Pool::new("tracegate-agent", Duration::from_millis(250)));
        pool.add_peer(&mock.address());
        let manager =
            TchannelConfigManager::new(pool, "trace-collector", Duration::from_secs(1));

        let strategy = manager.get_sampling_strategy("frontend").await.unwrap();
        assert_eq!(strategy.strategy_type, SamplingStrategyType::RateLimiting);
        assert_eq!(
            strategy.rate_limiting_sampling.unwrap().max_traces_per_second,
            42
        );

        let restrictions = manager.get_baggage_restrictions("frontend").await.unwrap();
        assert!(restrictions.is_empty());
    }
}
