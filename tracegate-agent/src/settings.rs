use crate::proxy::ReporterType;
use crate::reporter::HttpAuth;
use crate::throttle::{AccountOptions, ThrottlerConfig};
use serde::Deserialize;
use serde_with::serde_as;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSettings {
    pub processors: ProcessorsSettings,
    pub reporter: ReporterSettings,
    pub throttler: ThrottlerSettings,
}

impl AgentSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, processor) in [
            ("jaeger_compact", &self.processors.jaeger_compact),
            ("jaeger_binary", &self.processors.jaeger_binary),
            ("zipkin_compact", &self.processors.zipkin_compact),
        ] {
            if processor.enabled && (processor.workers == 0 || processor.queue_size == 0) {
                anyhow::bail!("processor {name} needs at least one worker and a non-empty queue");
            }
        }
        // Surfaces conflicting auth at startup instead of on first submit.
        self.reporter.http.auth()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorsSettings {
    pub jaeger_compact: ProcessorSettings,
    pub jaeger_binary: ProcessorSettings,
    pub zipkin_compact: ProcessorSettings,
}

impl Default for ProcessorsSettings {
    fn default() -> Self {
        Self {
            jaeger_compact: ProcessorSettings::with_port(6831, true),
            jaeger_binary: ProcessorSettings::with_port(6832, true),
            zipkin_compact: ProcessorSettings::with_port(5775, false),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorSettings {
    pub enabled: bool,
    pub addr: SocketAddr,
    pub max_packet_size: usize,
    pub queue_size: usize,
    pub workers: usize,
}

impl ProcessorSettings {
    fn with_port(port: u16, enabled: bool) -> Self {
        Self {
            enabled,
            addr: SocketAddr::from_str(&format!("0.0.0.0:{port}")).unwrap(),
            max_packet_size: 65_000,
            queue_size: 1_000,
            workers: 10,
        }
    }
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self::with_port(6831, true)
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReporterSettings {
    #[serde(rename = "type")]
    pub reporter_type: ReporterType,
    /// Timeout for sampling/baggage queries, in milliseconds.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub query_timeout: Duration,
    pub grpc: GrpcReporterSettings,
    pub http: HttpReporterSettings,
    pub tchannel: TchannelReporterSettings,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            reporter_type: ReporterType::Grpc,
            query_timeout: Duration::from_secs(5),
            grpc: GrpcReporterSettings::default(),
            http: HttpReporterSettings::default(),
            tchannel: TchannelReporterSettings::default(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GrpcReporterSettings {
    pub collector_endpoint: Option<String>,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub report_timeout: Duration,
}

impl Default for GrpcReporterSettings {
    fn default() -> Self {
        Self {
            collector_endpoint: None,
            report_timeout: Duration::from_secs(5),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpReporterSettings {
    /// Only the first entry is dialed today; the list form is kept so a
    /// balancing strategy can slot in without a settings change.
    pub collector_host_ports: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub report_timeout: Duration,
}

impl Default for HttpReporterSettings {
    fn default() -> Self {
        Self {
            collector_host_ports: Vec::new(),
            username: None,
            password: None,
            bearer_token: None,
            api_key: None,
            report_timeout: Duration::from_secs(5),
        }
    }
}

impl HttpReporterSettings {
    /// At most one auth mechanism may be configured.
    pub fn auth(&self) -> anyhow::Result<HttpAuth> {
        let basic = self.username.is_some() || self.password.is_some();
        let configured =
            [basic, self.bearer_token.is_some(), self.api_key.is_some()]
                .iter()
                .filter(|present| **present)
                .count();
        if configured > 1 {
            anyhow::bail!(
                "basic auth, bearer token and api key are mutually exclusive; pick one"
            );
        }
        if basic {
            let (Some(username), Some(password)) = (&self.username, &self.password) else {
                anyhow::bail!("basic auth needs both username and password");
            };
            return Ok(HttpAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }
        if let Some(token) = &self.bearer_token {
            return Ok(HttpAuth::Bearer(token.clone()));
        }
        if let Some(key) = &self.api_key {
            return Ok(HttpAuth::ApiKey(key.clone()));
        }
        Ok(HttpAuth::None)
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TchannelReporterSettings {
    pub collector_host_ports: Vec<String>,
    pub collector_service_name: String,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub report_timeout: Duration,
    pub discovery: DiscoverySettings,
}

impl Default for TchannelReporterSettings {
    fn default() -> Self {
        Self {
            collector_host_ports: Vec::new(),
            collector_service_name: "trace-collector".to_string(),
            report_timeout: Duration::from_secs(1),
            discovery: DiscoverySettings::default(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySettings {
    pub min_peers: usize,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub conn_check_timeout: Duration,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub conn_check_interval: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            min_peers: 3,
            conn_check_timeout: Duration::from_millis(250),
            conn_check_interval: Duration::from_secs(10),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottlerSettings {
    pub enabled: bool,
    pub default_account: AccountSettings,
    pub account_overrides: HashMap<String, AccountSettings>,
    pub client_max_balance: f64,
    pub max_operations: usize,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub ttl: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub purge_interval: Duration,
}

impl Default for ThrottlerSettings {
    fn default() -> Self {
        let config = ThrottlerConfig::default();
        Self {
            enabled: false,
            default_account: AccountSettings::from(config.default_account),
            account_overrides: HashMap::new(),
            client_max_balance: config.client_max_balance,
            max_operations: config.max_operations,
            ttl: config.ttl,
            purge_interval: config.purge_interval,
        }
    }
}

impl ThrottlerSettings {
    pub fn to_config(&self) -> ThrottlerConfig {
        ThrottlerConfig {
            default_account: self.default_account.into(),
            account_overrides: self
                .account_overrides
                .iter()
                .map(|(service, account)| (service.clone(), (*account).into()))
                .collect(),
            client_max_balance: self.client_max_balance,
            max_operations: self.max_operations,
            ttl: self.ttl,
            purge_interval: self.purge_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AccountSettings {
    pub credits_per_second: f64,
    pub max_balance: f64,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self::from(AccountOptions::default())
    }
}

impl From<AccountOptions> for AccountSettings {
    fn from(options: AccountOptions) -> Self {
        Self {
            credits_per_second: options.credits_per_second,
            max_balance: options.max_balance,
        }
    }
}

impl From<AccountSettings> for AccountOptions {
    fn from(settings: AccountSettings) -> Self {
        Self {
            credits_per_second: settings.credits_per_second,
            max_balance: settings.max_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_use_the_well_known_ports() {
        let settings = AgentSettings::default();
        assert_eq!(settings.processors.jaeger_compact.addr.port(), 6831);
        assert_eq!(settings.processors.jaeger_binary.addr.port(), 6832);
        assert_eq!(settings.processors.zipkin_compact.addr.port(), 5775);
        assert!(!settings.processors.zipkin_compact.enabled);
        settings.validate().unwrap();
    }

    #[test]
    fn conflicting_auth_is_rejected() {
        let mut settings = AgentSettings::default();
        settings.reporter.http.username = Some("jdoe".to_string());
        settings.reporter.http.password = Some("password".to_string());
        settings.reporter.http.bearer_token = Some("token".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn auth_precedence_resolves_to_single_variant() {
        let mut http = HttpReporterSettings {
            username: Some("jdoe".to_string()),
            password: Some("password".to_string()),
            ..Default::default()
        };
        assert!(matches!(http.auth().unwrap(), HttpAuth::Basic { .. }));
        http.username = None;
        http.password = None;
        http.api_key = Some("key".to_string());
        assert_eq!(http.auth().unwrap(), HttpAuth::ApiKey("key".to_string()));
    }

    #[test]
    fn partial_basic_auth_is_rejected() {
        let http = HttpReporterSettings {
            username: Some("jdoe".to_string()),
            ..Default::default()
        };
        assert!(http.auth().is_err());
    }
}
