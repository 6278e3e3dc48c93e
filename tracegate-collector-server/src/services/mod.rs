mod collector;
mod http_ingest;
mod sampling;

pub use collector::{CollectorGrpcService, SpanIngest};
pub use http_ingest::route_thrift_ingest;
pub use sampling::SamplingGrpcService;
