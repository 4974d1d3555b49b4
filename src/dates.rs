//! Temporal Bucketing
//!
//! Maps Unix timestamps to the hour/day bucket keys that key the derived
//! time-series records. Pure truncation, no wall-clock involvement.

use chrono::DateTime;

const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 86400;

/// Start-of-UTC-day timestamp for the given timestamp.
pub fn day_bucket(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(SECONDS_PER_DAY)
}

/// Start-of-UTC-hour timestamp for the given timestamp.
pub fn hour_bucket(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(SECONDS_PER_HOUR)
}

/// Human-readable label for a bucket key, for log lines only.
pub fn bucket_label(bucket: i64) -> String {
    DateTime::from_timestamp(bucket, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| bucket.to_string())
}
