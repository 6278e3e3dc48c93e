use serde::Deserialize;
use tracing_subscriber::{
    filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt, prelude::*, Layer,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracingSettings {
    pub enabled: bool,
    pub format: TracingFormat,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            format: TracingFormat::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    Default,
    Json,
}

pub fn init_logs(settings: &TracingSettings) -> Result<(), anyhow::Error> {
    // If tracing is disabled, there is nothing to initialize
    if !settings.enabled {
        return Ok(());
    }

    let stdout_layer: Box<dyn Layer<_> + Sync + Send + 'static> = match settings.format {
        TracingFormat::Default => tracing_subscriber::fmt::layer()
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .boxed(),
        TracingFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .boxed(),
    };

    let registry = tracing_subscriber::registry().with(vec![stdout_layer]);
    registry.try_init()?;

    Ok(())
}
