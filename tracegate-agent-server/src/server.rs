use crate::settings::Settings;
use std::sync::Arc;
use tracegate_agent::proxy::build_collector_proxy;
use tracegate_agent::sampling::{route_sampling, SamplingState};
use tracegate_agent::Agent;
use tracegate_launcher::{HttpRouter, LaunchSettings, Metrics};

const SERVICE_NAME: &str = "tracegate_agent";

#[derive(Clone)]
struct Router {
    sampling: Arc<SamplingState>,
}

impl HttpRouter for Router {
    fn register_routes(&self, service_config: &mut actix_web::web::ServiceConfig) {
        route_sampling(service_config, Arc::clone(&self.sampling));
    }
}

pub async fn run(settings: Settings) -> Result<(), anyhow::Error> {
    let metrics = Metrics::new(SERVICE_NAME, &settings.metrics.route);

    // Static endpoints only here; programmatic discovery is wired by
    // embedders that construct the proxy themselves.
    let proxy =
        build_collector_proxy(&settings.agent.reporter, metrics.registry(), None, None).await?;

    let agent = Agent::start(&settings.agent, proxy.reporter(), metrics.registry()).await?;

    let router = Router {
        sampling: Arc::new(SamplingState {
            manager: proxy.manager(),
            throttler: agent.throttler(),
        }),
    };

    let launch_settings = LaunchSettings {
        service_name: SERVICE_NAME.to_string(),
        server: settings.server,
        metrics: settings.metrics,
    };

    let result =
        tracegate_launcher::launch(&launch_settings, Some(metrics), router, None).await;

    agent.shutdown().await;
    proxy.close();
    result
}
