//! Shared plumbing for the tracegate servers: settings loading, tracing
//! setup, the prometheus metrics listener and the HTTP/gRPC launch loop.

pub mod launch;
pub mod metrics;
pub mod router;
pub mod settings;
pub mod tracing;

#[cfg(feature = "test-server")]
pub mod test_server;

pub use launch::{launch, LaunchSettings};
pub use metrics::Metrics;
pub use router::{configure_router, route_health, HttpRouter};
pub use settings::{
    ConfigSettings, GrpcServerSettings, HttpServerSettings, MetricsSettings, ServerSettings,
};
