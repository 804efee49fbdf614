/// Timestamped snapshots stored in the history log.
use serde::{Deserialize, Serialize};

/// A value as it was at the moment it was superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    /// The superseded value.
    pub value: T,
    /// Milliseconds since the Unix epoch (UTC) when the value was superseded.
    pub timestamp: i64,
}

impl<T> Record<T> {
    /// Snapshots `value`, stamped with the current time.
    pub fn new(value: T) -> Self {
        Self::with_timestamp(value, chrono::Utc::now().timestamp_millis())
    }

    /// Snapshots `value` with an explicit timestamp.
    pub fn with_timestamp(value: T, timestamp: i64) -> Self {
        Self { value, timestamp }
    }
}
