//! Error types for the time streaming service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure inside a streaming session or the server shell. It
//! implements `From<Error>` for `tonic::Status` so that errors propagate to
//! gRPC clients with appropriate status codes.
//!
//! ## Error Cases
//! - `ChannelError`: Writing an event to the response stream failed.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.
//!
//! Client cancellation is deliberately absent: a disconnect ends a session
//! normally and is never reported as an error.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the time streaming service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The response channel rejected an event (closed or failed transport).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => {
                Status::internal(format!("failed to send time: {context}"))
            }
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
