//! Server-side components of the `tickstream` service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and validation.
//! - [`health`] - Shared health register and the `/toggle-health` endpoint.
//! - [`service`] - `TimeService` gRPC implementation.
//! - [`streaming`] - Per-call clock, sink, and session loop.
//! - [`telemetry`] - Logging and optional OpenTelemetry export.
//! - [`tls`] - Loading TLS material for the gRPC listener.
//!
//! These components are wired together in the binary's `main.rs`.

pub mod config;
pub mod health;
pub mod service;
pub mod streaming;
pub mod telemetry;
pub mod tls;
