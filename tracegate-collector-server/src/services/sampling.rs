use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracegate_collector::strategy::StrategyStore;
use tracegate_proto::convert::strategy_to_proto;
use tracegate_proto::jaeger::api_v2::sampling_manager_server::SamplingManager;
use tracegate_proto::jaeger::api_v2::{SamplingStrategyParameters, SamplingStrategyResponse};

/// Answers the agent's sampling queries from the static strategy store.
pub struct SamplingGrpcService {
    store: Arc<StrategyStore>,
}

impl SamplingGrpcService {
    pub fn new(store: Arc<StrategyStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl SamplingManager for SamplingGrpcService {
    async fn get_sampling_strategy(
        &self,
        request: Request<SamplingStrategyParameters>,
    ) -> Result<Response<SamplingStrategyResponse>, Status> {
        let service_name = request.into_inner().service_name;
        if service_name.is_empty() {
            return Err(Status::invalid_argument("service_name is required"));
        }
        let strategy = self.store.get(&service_name);
        Ok(Response::new(strategy_to_proto(&strategy)))
    }
}
