//! Utilities. OBVIOUSLY.

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::ops::Deref;

pub mod ser;

/// A library-local representation of a time. Registry entries carry their
/// creation time as Unix epoch *milliseconds* on the wire, so this wrapper
/// pins both the serialized form and the precision in one place: everything
/// a `Timestamp` holds is already truncated to the millisecond, which keeps
/// in-memory ordering identical to the ordering replicas see after a
/// serialize/deserialize hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from the current date/time.
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// The wire representation: milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Build a Timestamp from epoch milliseconds. `None` if the value is out
    /// of chrono's representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        // truncate to wire precision; fall back untruncated at the edges of
        // the representable range
        let millis = date.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(date))
    }
}
