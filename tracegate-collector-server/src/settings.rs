use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracegate_launcher::tracing::TracingSettings;
use tracegate_launcher::{
    ConfigSettings, GrpcServerSettings, HttpServerSettings, MetricsSettings, ServerSettings,
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub metrics: MetricsSettings,
    pub tracing: TracingSettings,
    /// Optional static sampling-strategies file; without it every service
    /// gets the built-in default strategy.
    pub sampling_strategies_file: Option<PathBuf>,
    /// Service-name alias map applied by the ingest sanitizers.
    pub service_aliases: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                http: HttpServerSettings {
                    addr: SocketAddr::from_str("0.0.0.0:14268").unwrap(),
                    ..Default::default()
                },
                grpc: GrpcServerSettings {
                    enabled: true,
                    addr: SocketAddr::from_str("0.0.0.0:14250").unwrap(),
                },
            },
            metrics: MetricsSettings::default(),
            tracing: TracingSettings::default(),
            sampling_strategies_file: None,
            service_aliases: HashMap::new(),
        }
    }
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "TRACEGATE_COLLECTOR";
}
