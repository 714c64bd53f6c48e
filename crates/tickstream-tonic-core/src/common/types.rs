//! # Common Types and Constants
//!
//! Shared definitions used by both the server and its clients.
//!
//! ## Overview
//!
//! - [`HealthStatus`] - The single whole-service health flag.
//! - [`TimeEvent`] helpers - Construction from wall-clock timestamps using the
//!   canonical RFC 3339 wire format.
//!
//! ## Constants
//!
//! - [`DEFAULT_TICK_INTERVAL`] - Interval between two events of a stream.
//! - [`WHOLE_SERVICE`] - Health-check key that addresses the whole server.

use crate::proto::TimeEvent;
use chrono::{DateTime, SecondsFormat, TimeZone};
use core::fmt;
use core::time::Duration;

/// Default period between two [`TimeEvent`]s on one stream.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// The health-check service name that refers to the server as a whole.
pub const WHOLE_SERVICE: &str = "";

/// Whole-service health as reported over the standard health-check protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    #[default]
    Serving,
    NotServing,
}

impl HealthStatus {
    /// Returns the opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Serving => Self::NotServing,
            Self::NotServing => Self::Serving,
        }
    }

    /// Operator-facing label, `HEALTHY` or `UNHEALTHY`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Serving => "HEALTHY",
            Self::NotServing => "UNHEALTHY",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Formats a timestamp the way it travels on the wire: RFC 3339, whole
/// seconds, `Z` for UTC and a numeric offset otherwise.
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl TimeEvent {
    /// Builds the event emitted for a tick observed at `at`.
    pub fn at<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            current_time: format_timestamp(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn toggling_twice_restores_status() {
        let status = HealthStatus::default();
        assert_eq!(status, HealthStatus::Serving);
        assert_eq!(status.toggled(), HealthStatus::NotServing);
        assert_eq!(status.toggled().toggled(), status);
    }

    #[test]
    fn labels_match_operator_wording() {
        assert_eq!(HealthStatus::Serving.to_string(), "HEALTHY");
        assert_eq!(HealthStatus::NotServing.to_string(), "UNHEALTHY");
    }

    #[test]
    fn utc_timestamps_use_zulu_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 7).unwrap();
        assert_eq!(TimeEvent::at(&at).current_time, "2024-05-01T12:00:07Z");
    }

    #[test]
    fn offset_timestamps_keep_offset_and_drop_subseconds() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = tz
            .with_ymd_and_hms(2024, 5, 1, 14, 0, 7)
            .unwrap()
            .checked_add_signed(chrono::TimeDelta::milliseconds(250))
            .unwrap();
        assert_eq!(format_timestamp(&at), "2024-05-01T14:00:07+02:00");
    }
}
