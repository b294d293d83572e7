//! Typed ID wrappers for compile-time type safety.
//!
//! Activity-log ids are database-assigned surrogate keys (`BIGSERIAL`), so the
//! wrapper holds the raw `i64` and is transparent to both serde and sqlx.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an activity log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ActivityLogId(i64);

impl ActivityLogId {
    /// Wraps an id returned by the database.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw database value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActivityLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActivityLogId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<ActivityLogId> for i64 {
    fn from(id: ActivityLogId) -> Self {
        id.0
    }
}
