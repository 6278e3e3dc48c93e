use super::{BaggageRestriction, ClientConfigManager, ConfigManagerError};
use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracegate_model::strategy::SamplingStrategyResponse;
use tracegate_proto::convert::strategy_to_domain;
use tracegate_proto::jaeger::api_v2::sampling_manager_client::SamplingManagerClient;
use tracegate_proto::jaeger::api_v2::SamplingStrategyParameters;

/// Asks the collector's `SamplingManager` over gRPC. Baggage restrictions
/// never travelled over this transport.
pub struct GrpcConfigManager {
    channel: Channel,
    query_timeout: Duration,
}

impl GrpcConfigManager {
    pub fn dial(endpoint: &str, query_timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let channel = Endpoint::from_shared(endpoint)?.connect_lazy();
        Ok(Self::new(channel, query_timeout))
    }

    pub fn new(channel: Channel, query_timeout: Duration) -> Self {
        Self {
            channel,
            query_timeout,
        }
    }
}

#[async_trait]
impl ClientConfigManager for GrpcConfigManager {
    async fn get_sampling_strategy(
        &self,
        service_name: &str,
    ) -> Result<SamplingStrategyResponse, ConfigManagerError> {
        let mut client = SamplingManagerClient::new(self.channel.clone());
        let mut request = tonic::Request::new(SamplingStrategyParameters {
            service_name: service_name.to_string(),
        });
        request.set_timeout(self.query_timeout);
        let response = client
            .get_sampling_strategy(request)
            .await
            .map_err(|status| ConfigManagerError::Upstream(status.to_string()))?;
        Ok(strategy_to_domain(response.into_inner()))
    }

    async fn get_baggage_restrictions(
        &self,
        _service_name: &str,
    ) -> Result<Vec<BaggageRestriction>, ConfigManagerError> {
        Err(ConfigManagerError::NotImplemented("baggage restrictions"))
    }
}
