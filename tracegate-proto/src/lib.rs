//! gRPC wire types for the `jaeger.api_v2` collector surface.
//!
//! The message structs and the tonic client/server glue are maintained by
//! hand in the shape `tonic-build` would emit, so the build needs neither a
//! protobuf compiler nor a codegen step. If the service definitions ever
//! change, extend these modules the same way the generator would.

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod convert;

pub mod jaeger {
    pub mod api_v2 {
        include!("jaeger.api_v2.rs");
    }
}
