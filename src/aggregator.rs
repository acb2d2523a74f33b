//! Unique-trader counts over a time window.
//!
//! The input is the page of swaps returned by the unique-traders query, so
//! every count here is bounded by [`UNIQUE_TRADERS_PAGE_SIZE`]: when a pool
//! has more swaps in the window than one page holds, the oldest page is all
//! that gets counted. [`TraderAggregationResult::page_saturated`] reports
//! when that may have happened.

use crate::clock::{Clock, SystemClock};
use crate::executor::RawQueryResult;
use crate::query_builder::{SECONDS_PER_DAY, UNIQUE_TRADERS_PAGE_SIZE};
use chrono::DateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Invalid window: {window_days} days in buckets of {bucket_days} days")]
    InvalidWindow { window_days: u32, bucket_days: u32 },

    #[error("Malformed swap at index {index}: {reason}")]
    MalformedSwap { index: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub trader: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraderInterval {
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub start_date: String,
    pub end_date: String,
    pub unique_traders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraderAggregationResult {
    pub total_unique_traders: usize,
    /// Every swap received, including those before the window start.
    pub total_swaps: usize,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    /// Non-empty buckets only, oldest first.
    pub intervals: Vec<TraderInterval>,
    pub processed_swaps: Vec<SwapRecord>,
    /// The swap count reached the query page size, so older or newer swaps
    /// may be missing from the counts.
    pub page_saturated: bool,
}

fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Reads the `swaps` collection of a query result as [`SwapRecord`]s.
///
/// The trader is the swap's `origin`. A result without a `swaps` collection
/// has no records.
pub fn swap_records(raw: &RawQueryResult) -> Result<Vec<SwapRecord>, AggregationError> {
    let Some(swaps) = raw.records("swaps") else {
        return Ok(Vec::new());
    };

    swaps
        .iter()
        .enumerate()
        .map(|(index, swap)| {
            let trader = swap
                .get("origin")
                .and_then(Value::as_str)
                .ok_or_else(|| AggregationError::MalformedSwap {
                    index,
                    reason: "missing origin".to_string(),
                })?;
            let timestamp = swap
                .get("timestamp")
                .and_then(parse_timestamp)
                .ok_or_else(|| AggregationError::MalformedSwap {
                    index,
                    reason: "missing or invalid timestamp".to_string(),
                })?;
            Ok(SwapRecord {
                trader: trader.to_string(),
                timestamp,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct TraderAggregator<C = SystemClock> {
    clock: C,
}

impl TraderAggregator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> TraderAggregator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn aggregate(
        &self,
        swaps: Vec<SwapRecord>,
        window_days: u32,
        bucket_days: u32,
    ) -> Result<TraderAggregationResult, AggregationError> {
        aggregate_at(swaps, window_days, bucket_days, self.clock.now())
    }
}

/// Aggregates `swaps` over the `window_days` ending at `end`.
pub fn aggregate_at(
    swaps: Vec<SwapRecord>,
    window_days: u32,
    bucket_days: u32,
    end: i64,
) -> Result<TraderAggregationResult, AggregationError> {
    if window_days == 0 || bucket_days == 0 {
        return Err(AggregationError::InvalidWindow {
            window_days,
            bucket_days,
        });
    }

    let start = end.saturating_sub(i64::from(window_days) * SECONDS_PER_DAY);
    let bucket_width = i64::from(bucket_days) * SECONDS_PER_DAY;

    let (total_unique_traders, intervals) = {
        let mut unique_traders: HashSet<&str> = HashSet::new();
        let mut buckets: BTreeMap<i64, HashSet<&str>> = BTreeMap::new();

        for swap in &swaps {
            if swap.timestamp < start || swap.timestamp > end {
                continue;
            }
            unique_traders.insert(&swap.trader);
            let index = (swap.timestamp - start) / bucket_width;
            buckets.entry(index).or_default().insert(&swap.trader);
        }

        let intervals: Vec<TraderInterval> = buckets
            .iter()
            .map(|(index, traders)| {
                let interval_start = start + index * bucket_width;
                let interval_end = (interval_start + bucket_width).min(end);
                TraderInterval {
                    start_timestamp: interval_start,
                    end_timestamp: interval_end,
                    start_date: format_date(interval_start),
                    end_date: format_date(interval_end),
                    unique_traders: traders.len(),
                }
            })
            .collect();

        (unique_traders.len(), intervals)
    };

    debug!(
        "Aggregated {} swaps: {} unique traders in {} intervals",
        swaps.len(),
        total_unique_traders,
        intervals.len()
    );

    Ok(TraderAggregationResult {
        total_unique_traders,
        total_swaps: swaps.len(),
        start_timestamp: start,
        end_timestamp: end,
        intervals,
        page_saturated: swaps.len() >= UNIQUE_TRADERS_PAGE_SIZE as usize,
        processed_swaps: swaps,
    })
}
