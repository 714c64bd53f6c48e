//! gRPC service implementation.
//!
//! ## Structure
//!
//! - [`handler`] - `TimeService` entry point ([`TimeStreamService`]), which
//!   spawns one streaming session per call.
//!
//! [`TimeStreamService`]: handler::TimeStreamService

pub mod handler;
