//! Process root tying the ingest pipeline together: UDP servers feeding
//! bounded queues, processor worker pools draining them into the reporter,
//! and the optional throttler, all under one shutdown token.

use crate::metrics::{ProcessorMetrics, ServerMetrics};
use crate::reporter::Reporter;
use crate::server::{ThriftProcessor, UdpServer, UdpServerConfig, WireFormat};
use crate::settings::{AgentSettings, ProcessorSettings};
use crate::throttle::Throttler;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Agent {
    shutdown: CancellationToken,
    server_handles: Vec<JoinHandle<()>>,
    processor_handles: Vec<JoinHandle<()>>,
    listen_addrs: Vec<(WireFormat, SocketAddr)>,
    throttler: Option<Arc<Throttler>>,
}

impl Agent {
    /// Binds every enabled UDP port and starts the worker pools. A port
    /// that cannot bind is fatal.
    pub async fn start(
        settings: &AgentSettings,
        reporter: Arc<dyn Reporter>,
        registry: &prometheus::Registry,
    ) -> anyhow::Result<Self> {
        settings.validate()?;

        let server_metrics = ServerMetrics::new(registry)?;
        let processor_metrics = ProcessorMetrics::new(registry)?;
        let throttler = settings
            .throttler
            .enabled
            .then(|| Arc::new(Throttler::new(settings.throttler.to_config())));

        let shutdown = CancellationToken::new();
        let mut agent = Self {
            shutdown: shutdown.clone(),
            server_handles: Vec::new(),
            processor_handles: Vec::new(),
            listen_addrs: Vec::new(),
            throttler,
        };

        let processors = [
            (WireFormat::JaegerCompact, &settings.processors.jaeger_compact),
            (WireFormat::JaegerBinary, &settings.processors.jaeger_binary),
            (WireFormat::ZipkinCompact, &settings.processors.zipkin_compact),
        ];
        for (format, processor_settings) in processors {
            if !processor_settings.enabled {
                continue;
            }
            agent
                .start_pipeline(
                    format,
                    processor_settings,
                    Arc::clone(&reporter),
                    &server_metrics,
                    &processor_metrics,
                )
                .await
                .with_context(|| format!("failed to start the {} pipeline", format.label()))?;
        }
        Ok(agent)
    }

    async fn start_pipeline(
        &mut self,
        format: WireFormat,
        settings: &ProcessorSettings,
        reporter: Arc<dyn Reporter>,
        server_metrics: &ServerMetrics,
        processor_metrics: &ProcessorMetrics,
    ) -> anyhow::Result<()> {
        let (tx, rx) = tokio::sync::mpsc::channel(settings.queue_size);
        let server = UdpServer::bind(
            &UdpServerConfig {
                addr: settings.addr,
                max_packet_size: settings.max_packet_size,
                queue_size: settings.queue_size,
            },
            tx,
            server_metrics.for_format(format.label()),
        )
        .await?;
        self.listen_addrs.push((format, server.local_addr()?));

        let processor = ThriftProcessor::new(
            format,
            reporter,
            self.throttler.clone(),
            processor_metrics.for_format(format.label()),
        );

        let server_shutdown = self.shutdown.clone();
        self.server_handles
            .push(tokio::spawn(async move { server.run(server_shutdown).await }));
        let workers = settings.workers;
        self.processor_handles
            .push(tokio::spawn(async move { processor.run(rx, workers).await }));
        Ok(())
    }

    pub fn throttler(&self) -> Option<Arc<Throttler>> {
        self.throttler.clone()
    }

    pub fn listen_addr(&self, format: WireFormat) -> Option<SocketAddr> {
        self.listen_addrs
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, addr)| *addr)
    }

    /// Ordered shutdown: stop the readers, let the workers drain the
    /// queues, then close the throttler.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.server_handles {
            let _ = handle.await;
        }
        for handle in self.processor_handles {
            let _ = handle.await;
        }
        if let Some(throttler) = &self.throttler {
            throttler.close();
        }
        tracing::info!("agent pipelines stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ReporterMetrics;
    use crate::reporter::{MetricsReporter, TchannelReporter};
    use crate::settings::ProcessorsSettings;
    use crate::tchannel::Pool;
    use crate::testsupport::MockCollector;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use std::time::Duration;
    use tracegate_thrift::{agent as thrift_agent, jaeger, Protocol};

    fn test_settings() -> AgentSettings {
        let mut settings = AgentSettings::default();
        let mut processors = ProcessorsSettings::default();
        for processor in [
            &mut processors.jaeger_compact,
            &mut processors.jaeger_binary,
            &mut processors.zipkin_compact,
        ] {
            processor.addr = SocketAddr::from_str("127.0.0.1:0").unwrap();
        }
        processors.zipkin_compact.enabled = false;
        processors.jaeger_binary.enabled = false;
        settings.processors = processors;
        settings
    }

    fn span1_batch() -> jaeger::Batch {
        jaeger::Batch::new(
            jaeger::Process::new("svc"),
            vec![jaeger::Span {
                operation_name: "span1".to_string(),
                trace_id_low: 1,
                span_id: 2,
                start_time: 1,
                duration: 1,
                ..Default::default()
            }],
        )
    }

    async fn start_agent(
        fail_submissions: bool,
    ) -> (
        Agent,
        MockCollector,
        crate::metrics::FormatReporterMetrics,
        SocketAddr,
    ) {
        let mock = MockCollector::start(fail_submissions).await;
        let pool = Arc::new(Pool::new("tracegate-agent", Duration::from_millis(250)));
        pool.add_peer(&mock.address());
        let registry = prometheus::Registry::new();
        let reporter_metrics = ReporterMetrics::new(&registry).unwrap();
        let handles = reporter_metrics.for_format("jaeger");
        let reporter: Arc<dyn Reporter> = Arc::new(MetricsReporter::new(
            Arc::new(TchannelReporter::new(
                pool,
                "trace-collector",
                Duration::from_secs(1),
            )),
            &reporter_metrics,
        ));

        let agent = Agent::start(&test_settings(), reporter, &registry)
            .await
            .unwrap();
        let addr = agent.listen_addr(WireFormat::JaegerCompact).unwrap();
        (agent, mock, handles, addr)
    }

    #[tokio::test]
    async fn udp_batch_reaches_the_collector() {
        let (agent, mock, handles, addr) = start_agent(false).await;

        let payload =
            thrift_agent::encode_emit_batch(&span1_batch(), Protocol::Compact).unwrap();
        let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&payload, addr).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let batches = mock.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].spans[0].operation_name, "span1");
        assert_eq!(handles.batches_submitted.get(), 1);
        assert_eq!(handles.spans_submitted.get(), 1);
        assert_eq!(handles.batches_failures.get(), 0);

        agent.shutdown().await;
    }

    #[tokio::test]
    async fn collector_failure_shows_up_in_failure_counters() {
        let (agent, mock, handles, addr) = start_agent(true).await;

        let payload =
            thrift_agent::encode_emit_batch(&span1_batch(), Protocol::Compact).unwrap();
        let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&payload, addr).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        // The mock stored the batch but answered ok=false.
        assert_eq!(mock.batches().len(), 1);
        assert_eq!(handles.batches_failures.get(), 1);
        assert_eq!(handles.spans_failures.get(), 1);
        assert_eq!(handles.batches_submitted.get(), 0);

        agent.shutdown().await;
    }
}
