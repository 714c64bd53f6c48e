//! Lock-guarded whole-service health status.
//!
//! [`HealthRegister`] owns the only mutable state shared between requests. It
//! is the sole writer of the `tonic-health` reporter, so the standard
//! `grpc.health.v1.Health` service (check and watch) always reflects the last
//! completed mutation.

use tickstream_tonic_core::types::{HealthStatus, WHOLE_SERVICE};
use tokio::sync::Mutex;
use tonic_health::{ServingStatus, server::HealthReporter};

/// Shared, serialized health status.
///
/// Every operation takes the same lock and holds it while the new value is
/// published to the health reporter, so watchers observe mutations in the
/// order they happened and a check issued after `toggle` returns never sees
/// the previous value.
pub struct HealthRegister {
    status: Mutex<HealthStatus>,
    reporter: HealthReporter,
    services: Vec<String>,
}

impl HealthRegister {
    /// Creates a register that starts out [`HealthStatus::Serving`].
    ///
    /// The status is published under the whole-service key (`""`) and under
    /// each name in `services`. All keys always carry the same value.
    pub async fn new<I, S>(reporter: HealthReporter, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys = vec![WHOLE_SERVICE.to_string()];
        for service in services {
            let service = service.into();
            if !keys.contains(&service) {
                keys.push(service);
            }
        }

        let register = Self {
            status: Mutex::new(HealthStatus::Serving),
            reporter,
            services: keys,
        };
        register.set_serving_status(HealthStatus::Serving).await;
        register
    }

    /// Returns the current status.
    pub async fn get(&self) -> HealthStatus {
        *self.status.lock().await
    }

    /// Flips `Serving` and `NotServing` and returns the new status.
    pub async fn toggle(&self) -> HealthStatus {
        let mut status = self.status.lock().await;
        *status = status.toggled();
        self.publish(*status).await;
        *status
    }

    /// Sets an explicit status, e.g. `NotServing` while shutting down.
    pub async fn set_serving_status(&self, new_status: HealthStatus) {
        let mut status = self.status.lock().await;
        *status = new_status;
        self.publish(new_status).await;
    }

    async fn publish(&self, status: HealthStatus) {
        let serving_status = serving_status(status);
        for service in &self.services {
            self.reporter
                .set_service_status(service, serving_status)
                .await;
        }
    }
}

const fn serving_status(status: HealthStatus) -> ServingStatus {
    match status {
        HealthStatus::Serving => ServingStatus::Serving,
        HealthStatus::NotServing => ServingStatus::NotServing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn register() -> HealthRegister {
        let (reporter, _service) = tonic_health::server::health_reporter();
        HealthRegister::new(reporter, ["tickstream.TimeService"]).await
    }

    #[tokio::test]
    async fn starts_serving() {
        assert_eq!(register().await.get().await, HealthStatus::Serving);
    }

    #[tokio::test]
    async fn parity_of_toggles_decides_status() {
        let register = register().await;
        for n in 1..=7 {
            let status = register.toggle().await;
            let expected = if n % 2 == 0 {
                HealthStatus::Serving
            } else {
                HealthStatus::NotServing
            };
            assert_eq!(status, expected);
            assert_eq!(register.get().await, expected);
        }
    }

    #[tokio::test]
    async fn explicit_status_overrides_toggle_state() {
        let register = register().await;
        register.set_serving_status(HealthStatus::NotServing).await;
        assert_eq!(register.get().await, HealthStatus::NotServing);
        assert_eq!(register.toggle().await, HealthStatus::Serving);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_are_serialized() {
        let register = Arc::new(register().await);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let register = Arc::clone(&register);
                tokio::spawn(async move { register.toggle().await })
            })
            .collect();

        let mut not_serving = 0;
        for handle in handles {
            if handle.await.unwrap() == HealthStatus::NotServing {
                not_serving += 1;
            }
        }

        // Each flip observes a distinct predecessor, so exactly half of the
        // returned values are NotServing and the final state is back home.
        assert_eq!(not_serving, 32);
        assert_eq!(register.get().await, HealthStatus::Serving);
    }
}
