//! Shard key and collection naming.
//!
//! A shard key is the zero-padded `YYYYMM` of a calendar month. A shard
//! collection is named `<prefix><YYYYMM>`, e.g. `transaction_month__202404`.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Six-digit `YYYYMM` identifier of one monthly shard.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ShardKey(String);

impl ShardKey {
    /// Build a key from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Self {
        ShardKey(format!("{:04}{:02}", year, month))
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Key of the UTC calendar month containing a millisecond epoch timestamp.
    ///
    /// Returns `None` when the timestamp is outside chrono's representable range.
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| Self::from_date(&dt))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full collection name for a shard of a dataset.
pub fn collection_name(prefix: &str, key: &ShardKey) -> String {
    format!("{}{}", prefix, key)
}

/// The months the lifecycle job acts on, relative to a reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleWindow {
    /// Shard that has aged out and gets retired.
    pub stale: ShardKey,
    pub previous: ShardKey,
    pub current: ShardKey,
    pub next: ShardKey,
}

impl LifecycleWindow {
    pub fn for_date(today: NaiveDate) -> Self {
        // Month arithmetic from the 1st so day-of-month never clamps.
        let first = today.with_day(1).unwrap_or(today);
        let shift_back = |n: u32| {
            first
                .checked_sub_months(Months::new(n))
                .map(|d| ShardKey::from_date(&d))
                .unwrap_or_else(|| ShardKey::from_date(&first))
        };
        let next = first
            .checked_add_months(Months::new(1))
            .map(|d| ShardKey::from_date(&d))
            .unwrap_or_else(|| ShardKey::from_date(&first));

        Self {
            stale: shift_back(2),
            previous: shift_back(1),
            current: ShardKey::from_date(&first),
            next,
        }
    }

    /// The three shards that must exist, oldest first.
    pub fn active(&self) -> [&ShardKey; 3] {
        [&self.previous, &self.current, &self.next]
    }
}
