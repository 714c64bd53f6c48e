//! Per-request time streaming.
//!
//! A time stream is a loop that waits for either the next clock tick or the
//! call's cancellation signal, and writes one `TimeEvent` per tick.
//!
//! ## Structure
//!
//! - [`clock`] - [`ClockSource`](clock::ClockSource) and the interval-backed
//!   implementation used in production.
//! - [`sink`] - [`EventSink`](sink::EventSink) and the channel-backed sink
//!   that feeds the gRPC response stream.
//! - [`session`] - [`run_session`](session::run_session), the state machine
//!   tying the two together.

pub mod clock;
pub mod session;
pub mod sink;
