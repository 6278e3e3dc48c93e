use config::{Config, File};
use serde::Deserialize;
use std::{net::SocketAddr, str::FromStr};

/// Settings loader shared by the servers. Values come from environment
/// variables prefixed with `{SERVICE_NAME}__` plus an optional config file
/// pointed at by `{SERVICE_NAME}__CONFIG`.
pub trait ConfigSettings {
    const SERVICE_NAME: &'static str;

    fn build() -> anyhow::Result<Self>
    where
        Self: for<'de> Deserialize<'de>,
    {
        let config_path_name = format!("{}__CONFIG", Self::SERVICE_NAME);
        let config_path = std::env::var(&config_path_name);

        let mut builder = Config::builder();
        if let Ok(config_path) = config_path {
            builder = builder.add_source(File::with_name(&config_path));
            std::env::remove_var(&config_path_name);
        };
        // Use `__` so that keys with underscores in names stay addressable.
        builder = builder
            .add_source(config::Environment::with_prefix(Self::SERVICE_NAME).separator("__"));

        let settings: Self = builder.build()?.try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// HTTP and gRPC server settings. By default the HTTP server is enabled and
/// gRPC is disabled.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub http: HttpServerSettings,
    pub grpc: GrpcServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpServerSettings {
    pub enabled: bool,
    pub addr: SocketAddr,
    pub max_body_size: usize,
}

impl Default for HttpServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: SocketAddr::from_str("0.0.0.0:8050").unwrap(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrpcServerSettings {
    pub enabled: bool,
    pub addr: SocketAddr,
}

impl Default for GrpcServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: SocketAddr::from_str("0.0.0.0:8051").unwrap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub addr: SocketAddr,
    pub route: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: SocketAddr::from_str("0.0.0.0:6060").expect("should be valid addr"),
            route: "/metrics".to_string(),
        }
    }
}
