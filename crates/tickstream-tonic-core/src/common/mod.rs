//! Shared protocol bindings, types, and errors for the `tickstream` service.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized service error type and its gRPC mapping.
//! - [`types`] - Health status flag, time event helpers, and defaults.
//! - [`proto`] - Generated Protobuf service and message definitions.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from
/// `proto/tickstream.proto`.
///
/// ## Service
///
/// - `TimeService/StreamTime` - Server stream of [`TimeEvent`]s, one per tick.
///
/// ## Messages
///
/// - [`TimeRequest`] - Empty; the tick interval is fixed server-side.
/// - [`TimeEvent`] - One RFC 3339 timestamp string.
///
/// [`TimeEvent`]: crate::proto::TimeEvent
/// [`TimeRequest`]: crate::proto::TimeRequest
pub mod proto {
    tonic::include_proto!("tickstream");

    /// Encoded descriptor set for the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("tickstream_descriptor");
}
