use actix_web::{App, HttpServer};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use std::net::SocketAddr;

/// Owns the metrics registry handed out to the rest of the process and the
/// actix middleware exposing it. The registry is passed around explicitly so
/// components register their collectors without global state.
#[derive(Clone)]
pub struct Metrics {
    registry: prometheus::Registry,
    middleware: PrometheusMetrics,
}

impl Metrics {
    pub fn new(service_name: &str, route: &str) -> Self {
        let registry = prometheus::Registry::new();
        let middleware = PrometheusMetricsBuilder::new(service_name)
            .registry(registry.clone())
            .endpoint(route)
            .build()
            .expect("failed to build prometheus middleware");
        Self {
            registry,
            middleware,
        }
    }

    pub fn registry(&self) -> &prometheus::Registry {
        &self.registry
    }

    pub fn http_middleware(&self) -> &PrometheusMetrics {
        &self.middleware
    }

    pub async fn run_server(&self, addr: SocketAddr) -> Result<(), anyhow::Error> {
        tracing::info!("starting metrics server on addr {addr}");
        let middleware = self.middleware.clone();
        let server = HttpServer::new(move || App::new().wrap(middleware.clone()))
            .bind(addr)?
            .run();
        server.await?;
        Ok(())
    }
}
