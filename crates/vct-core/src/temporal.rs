//! # Log Timestamps
//!
//! The log assigns each entry a timestamp in milliseconds since the Unix
//! epoch. That integer, not a formatted date, is part of the leaf pre-image,
//! so [`Timestamp`] stores it exactly and only converts to `chrono` for
//! display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, as assigned by the log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wrap a raw millisecond value.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Convert a UTC instant, dropping sub-millisecond precision.
    /// Instants before the epoch read as zero.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(u64::try_from(dt.timestamp_millis()).unwrap_or(0))
    }

    /// Raw milliseconds.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// The instant as a `chrono` value, if it is representable.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_utc() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_is_rfc3339_millis() {
        let ts = Timestamp::from_millis(1_583_814_252_164);
        assert_eq!(ts.to_string(), "2020-03-10T04:24:12.164Z");
    }

    #[test]
    fn from_utc_keeps_millis() {
        let dt = Utc.with_ymd_and_hms(2020, 3, 10, 4, 24, 12).unwrap()
            + chrono::Duration::milliseconds(164);
        assert_eq!(Timestamp::from_utc(dt).as_millis(), 1_583_814_252_164);
    }

    #[test]
    fn pre_epoch_is_zero() {
        let dt = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Timestamp::from_utc(dt), Timestamp::default());
    }

    #[test]
    fn serde_is_a_bare_integer() {
        let ts = Timestamp::from_millis(12345);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "12345");
        let back: Timestamp = serde_json::from_str("12345").unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn ordering_follows_millis() {
        assert!(Timestamp::from_millis(1) < Timestamp::from_millis(2));
    }
}
