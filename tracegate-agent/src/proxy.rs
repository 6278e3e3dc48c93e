//! Assembles the transport, discovery, reporter stack and config manager
//! for the configured collector protocol.

use crate::discovery::{Discoverer, Notifier, PeerListManager, PeerListManagerConfig};
use crate::metrics::{ClientStatsMetrics, ConfigManagerMetrics, ReporterMetrics};
use crate::reporter::{
    ClientMetricsReporter, GrpcReporter, HttpReporter, MetricsReporter, Reporter,
    TchannelReporter,
};
use crate::sampling::{
    BaggageRestriction, ClientConfigManager, ConfigManagerError, GrpcConfigManager,
    MetricsConfigManager, TchannelConfigManager,
};
use crate::settings::ReporterSettings;
use crate::tchannel::Pool;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracegate_model::strategy::SamplingStrategyResponse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterType {
    #[default]
    Grpc,
    Http,
    Tchannel,
}

/// What the agent gets back from the builder: a reporter for span batches
/// and a config manager for sampling strategies, sharing one transport.
pub struct CollectorProxy {
    reporter: Arc<dyn Reporter>,
    manager: Arc<dyn ClientConfigManager>,
    peer_manager: Option<PeerListManager>,
}

impl std::fmt::Debug for CollectorProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorProxy").finish_non_exhaustive()
    }
}

impl CollectorProxy {
    pub fn reporter(&self) -> Arc<dyn Reporter> {
        Arc::clone(&self.reporter)
    }

    pub fn manager(&self) -> Arc<dyn ClientConfigManager> {
        Arc::clone(&self.manager)
    }

    /// Stops peer management; transports close once the last reporter
    /// handle drops.
    pub fn close(&self) {
        if let Some(peer_manager) = &self.peer_manager {
            peer_manager.stop();
        }
    }
}

/// Builds the collector proxy. Wiring failures here are configuration
/// errors and fatal at startup.
pub async fn build_collector_proxy(
    settings: &ReporterSettings,
    registry: &prometheus::Registry,
    discoverer: Option<Arc<dyn Discoverer>>,
    notifier: Option<Arc<dyn Notifier>>,
) -> anyhow::Result<CollectorProxy> {
    let reporter_metrics = ReporterMetrics::new(registry)?;
    let client_stats_metrics = ClientStatsMetrics::new(registry)?;
    let manager_metrics = ConfigManagerMetrics::new(registry)?;

    let (transport, manager, peer_manager): (
        Arc<dyn Reporter>,
        Arc<dyn ClientConfigManager>,
        Option<PeerListManager>,
    ) = match settings.reporter_type {
        ReporterType::Grpc => {
            let endpoint = settings
                .grpc
                .collector_endpoint
                .as_deref()
                .context("grpc reporter requires a collector endpoint")?;
            let reporter = GrpcReporter::dial(endpoint, settings.grpc.report_timeout)
                .context("failed to set up the grpc collector channel")?;
            let manager = GrpcConfigManager::dial(endpoint, settings.query_timeout)
                .context("failed to set up the grpc sampling channel")?;
            (Arc::new(reporter), Arc::new(manager), None)
        }
        ReporterType::Http => {
            let reporter = HttpReporter::new(
                &settings.http.collector_host_ports,
                settings.http.auth()?,
                settings.http.report_timeout,
            )
            .context("failed to set up the http reporter")?;
            (
                Arc::new(reporter),
                Arc::new(UnsupportedConfigManager),
                None,
            )
        }
        ReporterType::Tchannel => {
            let tchannel = &settings.tchannel;
            let pool = Arc::new(Pool::new("tracegate-agent", tchannel.report_timeout));
            pool.set_peers(&tchannel.collector_host_ports);

            let peer_manager = match (discoverer, notifier) {
                (Some(discoverer), Some(notifier)) => Some(
                    PeerListManager::start(
                        Arc::clone(&pool),
                        discoverer,
                        notifier,
                        PeerListManagerConfig {
                            min_peers: tchannel.discovery.min_peers,
                            conn_check_timeout: tchannel.discovery.conn_check_timeout,
                            conn_check_interval: tchannel.discovery.conn_check_interval,
                        },
                    )
                    .await
                    .context("failed to wire collector discovery")?,
                ),
                (None, None) => {
                    if tchannel.collector_host_ports.is_empty() {
                        anyhow::bail!(
                            "no static collector endpoints and no discoverer configured"
                        );
                    }
                    None
                }
                _ => anyhow::bail!("discoverer and notifier must be configured together"),
            };

            let reporter = TchannelReporter::new(
                Arc::clone(&pool),
                tchannel.collector_service_name.clone(),
                tchannel.report_timeout,
            );
            let manager = TchannelConfigManager::new(
                pool,
                tchannel.collector_service_name.clone(),
                settings.query_timeout,
            );
            (Arc::new(reporter), Arc::new(manager), peer_manager)
        }
    };

    // Decorator order: metrics over client-metrics over the transport.
    let reporter: Arc<dyn Reporter> = Arc::new(MetricsReporter::new(
        Arc::new(ClientMetricsReporter::new(transport, client_stats_metrics)),
        &reporter_metrics,
    ));
    let manager: Arc<dyn ClientConfigManager> =
        Arc::new(MetricsConfigManager::new(manager, &manager_metrics));

    Ok(CollectorProxy {
        reporter,
        manager,
        peer_manager,
    })
}

/// Stand-in for transports with no sampling surface.
struct UnsupportedConfigManager;

#[async_trait]
impl ClientConfigManager for UnsupportedConfigManager {
    async fn get_sampling_strategy(
        &self,
        _service_name: &str,
    ) -> Result<SamplingStrategyResponse, ConfigManagerError> {
        Err(ConfigManagerError::NotImplemented("sampling strategies"))
    }

    async fn get_baggage_restrictions(
        &self,
        _service_name: &str,
    ) -> Result<Vec<BaggageRestriction>, ConfigManagerError> {
        Err(ConfigManagerError::NotImplemented("baggage restrictions"))
    }
}
