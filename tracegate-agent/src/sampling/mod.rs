//! Sampling-strategy plumbing: the agent queries the collector through a
//! [`ClientConfigManager`] and serves the result to tracers over HTTP.

mod grpc;
mod manager;
mod server;
mod tchannel;

pub use grpc::GrpcConfigManager;
pub use manager::{
    BaggageRestriction, ClientConfigManager, ConfigManagerError, MetricsConfigManager,
};
pub use server::{route_sampling, SamplingState};
pub use tchannel::TchannelConfigManager;
