//! Time-bucketed counting.
//!
//! The store keeps exactly one kind of state: a count per (item type, ISO
//! calendar date). Weekly, monthly, and all-time figures are always derived
//! by summing dated buckets at query time, never maintained as separate
//! running totals, so clearing one window cannot drift the others out of
//! sync.
//!
//! Every mutation flushes a JSON snapshot through the [`StateStore`]. A
//! failed flush is logged and retried on the next mutation; it never blocks
//! the pipeline.

mod state_store;

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ItemType;

pub use state_store::{InMemoryStateStore, SqliteStateStore, StateStore};

/// Snapshot key in the state store. Versioned so a future format change can
/// migrate instead of misparsing.
const SNAPSHOT_KEY: &str = "counters:v1";

/// Query/reset granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rollup {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

/// One aggregated bucket in a query result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    /// Bucket key: `2024-01-01` (daily), `2024-W01` (weekly), `2024-01`
    /// (monthly), or `all_time`.
    pub key: String,
    pub count: u64,
}

type Buckets = BTreeMap<ItemType, BTreeMap<NaiveDate, u64>>;

pub struct CounterStore {
    buckets: Buckets,
    store: Box<dyn StateStore>,
    /// Set when the last flush failed; counts are not yet durable.
    flush_pending: bool,
}

impl CounterStore {
    /// Load persisted state through the store. An absent snapshot means
    /// empty state; a snapshot that does not parse is an internal-logic
    /// error and fails the open.
    pub fn open(mut store: Box<dyn StateStore>) -> Result<Self> {
        let buckets = match store.load(SNAPSHOT_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .context("corrupt counter snapshot; refusing to start from partial state")?,
            None => Buckets::new(),
        };
        Ok(Self {
            buckets,
            store,
            flush_pending: false,
        })
    }

    /// Add `amount` (>= 1) to the bucket for `timestamp`'s date, creating
    /// the bucket if absent. Safe to call once per confirmation event.
    pub fn apply(&mut self, item: ItemType, amount: u64, timestamp: DateTime<Utc>) -> Result<()> {
        if amount == 0 {
            return Err(anyhow!("counter apply amount must be >= 1"));
        }
        let date = timestamp.date_naive();
        *self
            .buckets
            .entry(item)
            .or_default()
            .entry(date)
            .or_insert(0) += amount;
        self.flush();
        Ok(())
    }

    /// One human-confirmed observation, for item types the detector cannot
    /// see.
    pub fn manual_apply(&mut self, item: ItemType, timestamp: DateTime<Utc>) -> Result<()> {
        self.apply(item, 1, timestamp)
    }

    /// Aggregated counts for an item, bucketed by the rollup.
    ///
    /// With a `range`, every bucket key covered by the range appears in the
    /// result, zero-filled. Without one, only
    /// dates that have recorded counts contribute. `AllTime` always returns
    /// a single scalar bucket, computed by summation.
    pub fn query(
        &self,
        item: ItemType,
        rollup: Rollup,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Vec<BucketCount> {
        let dated = self.buckets.get(&item);

        if let Rollup::AllTime = rollup {
            let count = dated
                .map(|buckets| {
                    buckets
                        .iter()
                        .filter(|(date, _)| in_range(**date, range))
                        .map(|(_, count)| *count)
                        .sum()
                })
                .unwrap_or(0);
            return vec![BucketCount {
                key: "all_time".to_string(),
                count,
            }];
        }

        let mut grouped: BTreeMap<String, u64> = BTreeMap::new();

        // Zero-fill the requested window so every covered bucket shows up.
        if let Some((start, end)) = range {
            let mut date = start;
            while date <= end {
                grouped.entry(bucket_key(rollup, date)).or_insert(0);
                date = match date.succ_opt() {
                    Some(next) => next,
                    None => break,
                };
            }
        }

        if let Some(buckets) = dated {
            for (date, count) in buckets {
                if !in_range(*date, range) {
                    continue;
                }
                *grouped.entry(bucket_key(rollup, *date)).or_insert(0) += count;
            }
        }

        grouped
            .into_iter()
            .map(|(key, count)| BucketCount { key, count })
            .collect()
    }

    /// All-time total for an item, by summation.
    pub fn total(&self, item: ItemType) -> u64 {
        self.buckets
            .get(&item)
            .map(|buckets| buckets.values().sum())
            .unwrap_or(0)
    }

    /// Clear only the buckets inside the rollup's window around `now`, for
    /// every item type. Dates outside the window are untouched, so queries
    /// over other windows are unaffected by construction.
    pub fn reset(&mut self, rollup: Rollup, now: DateTime<Utc>) {
        let today = now.date_naive();
        for buckets in self.buckets.values_mut() {
            buckets.retain(|date, _| !same_window(rollup, *date, today));
        }
        self.flush();
    }

    /// True while the latest snapshot has not reached the state store.
    pub fn flush_pending(&self) -> bool {
        self.flush_pending
    }

    /// Fire-and-forget snapshot write. Failure is logged and leaves
    /// `flush_pending` set; the next mutation retries.
    fn flush(&mut self) {
        let bytes = match serde_json::to_vec(&self.buckets) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("counter snapshot serialization failed: {}", err);
                self.flush_pending = true;
                return;
            }
        };
        match self.store.save(SNAPSHOT_KEY, &bytes) {
            Ok(()) => self.flush_pending = false,
            Err(err) => {
                log::warn!("counter flush failed, will retry on next mutation: {}", err);
                self.flush_pending = true;
            }
        }
    }
}

fn in_range(date: NaiveDate, range: Option<(NaiveDate, NaiveDate)>) -> bool {
    match range {
        Some((start, end)) => date >= start && date <= end,
        None => true,
    }
}

fn bucket_key(rollup: Rollup, date: NaiveDate) -> String {
    match rollup {
        Rollup::Daily => date.format("%Y-%m-%d").to_string(),
        Rollup::Weekly => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Rollup::Monthly => date.format("%Y-%m").to_string(),
        Rollup::AllTime => "all_time".to_string(),
    }
}

/// Whether `date` falls in the same rollup window as `today`.
fn same_window(rollup: Rollup, date: NaiveDate, today: NaiveDate) -> bool {
    match rollup {
        Rollup::Daily => date == today,
        Rollup::Weekly => date.iso_week() == today.iso_week(),
        Rollup::Monthly => date.year() == today.year() && date.month() == today.month(),
        Rollup::AllTime => true,
    }
}
