//! Whole-service health: the shared register and the HTTP control surface
//! that flips it.
//!
//! ## Structure
//!
//! - [`register`] - [`HealthRegister`](register::HealthRegister), the single
//!   lock-guarded status shared with the gRPC health service.
//! - [`control`] - `/toggle-health` handler and router.

pub mod control;
pub mod register;
