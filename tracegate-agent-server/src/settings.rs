use serde::Deserialize;
use std::net::SocketAddr;
use std::str::FromStr;
use tracegate_agent::settings::AgentSettings;
use tracegate_launcher::tracing::TracingSettings;
use tracegate_launcher::{ConfigSettings, HttpServerSettings, MetricsSettings, ServerSettings};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub metrics: MetricsSettings,
    pub tracing: TracingSettings,
    pub agent: AgentSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // The client-facing HTTP surface (sampling + credits).
            server: ServerSettings {
                http: HttpServerSettings {
                    addr: SocketAddr::from_str("0.0.0.0:5778").unwrap(),
                    ..Default::default()
                },
                ..Default::default()
            },
            metrics: MetricsSettings::default(),
            tracing: TracingSettings::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "TRACEGATE_AGENT";

    fn validate(&self) -> anyhow::Result<()> {
        self.agent.validate()
    }
}
