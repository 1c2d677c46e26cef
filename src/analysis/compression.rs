//! Downsampling of OHLCV series into chart buckets.
//!
//! Input must be ordered by `time` ascending. Out-of-order input is rejected
//! with `PreconditionViolation` rather than bucketed incorrectly.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    config::{COMPRESSION, DF},
    domain::{CompressedBucket, OhlcvPoint, Timeframe},
    error::{MarketDataError, Result},
};

/// How points are partitioned into buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BucketStrategy {
    /// Fixed number of consecutive points per bucket (`Timeframe::points_per_bucket`).
    #[default]
    PointCount,
    /// Points sharing the same wall-clock window (`Timeframe::bucket_width_ms`).
    Interval,
}

/// How open and close are derived for a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OhlcAggregation {
    /// Mean of constituent opens and closes. May leave open/close outside high/low.
    #[default]
    Mean,
    /// First open and last close, standard candlestick semantics.
    Candlestick,
}

#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    pub strategy: BucketStrategy,
    pub aggregation: OhlcAggregation,
    pub bypass_threshold: usize,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            strategy: COMPRESSION.strategy,
            aggregation: COMPRESSION.aggregation,
            bypass_threshold: COMPRESSION.bypass_threshold,
        }
    }
}

impl Compressor {
    pub fn new(strategy: BucketStrategy, aggregation: OhlcAggregation) -> Self {
        Self {
            strategy,
            aggregation,
            ..Self::default()
        }
    }

    pub fn run(&self, points: &[OhlcvPoint], timeframe: Timeframe) -> Result<Vec<CompressedBucket>> {
        ensure_ascending(points)?;

        if points.len() <= self.bypass_threshold {
            return Ok(points.iter().map(CompressedBucket::from).collect());
        }

        let buckets = crate::trace_time!("compress", COMPRESSION.slow_threshold_micros, {
            match self.strategy {
                BucketStrategy::PointCount => points
                    .chunks(timeframe.points_per_bucket())
                    .map(|group| aggregate(group, self.aggregation))
                    .collect::<Vec<_>>(),
                BucketStrategy::Interval => {
                    let width = timeframe.bucket_width_ms();
                    points
                        .chunk_by(|a, b| window_start(a.time, width) == window_start(b.time, width))
                        .map(|group| aggregate(group, self.aggregation))
                        .collect::<Vec<_>>()
                }
            }
        });

        #[cfg(debug_assertions)]
        if DF.log_compression {
            log::info!(
                "Compressed {} points into {} buckets ({}, {:?})",
                points.len(),
                buckets.len(),
                timeframe,
                self.strategy
            );
        }

        Ok(buckets)
    }
}

/// Count-based compression with mean open/close aggregation.
pub fn compress(points: &[OhlcvPoint], timeframe: Timeframe) -> Result<Vec<CompressedBucket>> {
    Compressor::new(BucketStrategy::PointCount, OhlcAggregation::Mean).run(points, timeframe)
}

/// Wall-clock bucketing: points are grouped by `floor(time / width)`.
pub fn compress_by_interval(
    points: &[OhlcvPoint],
    timeframe: Timeframe,
) -> Result<Vec<CompressedBucket>> {
    Compressor::new(BucketStrategy::Interval, OhlcAggregation::Mean).run(points, timeframe)
}

fn window_start(time: i64, width: i64) -> i64 {
    time.div_euclid(width) * width
}

fn ensure_ascending(points: &[OhlcvPoint]) -> Result<()> {
    match points
        .iter()
        .tuple_windows()
        .position(|(a, b)| b.time < a.time)
    {
        Some(idx) => Err(MarketDataError::PreconditionViolation(format!(
            "Points not in ascending time order at index {} ({} then {})",
            idx + 1,
            points[idx].time,
            points[idx + 1].time
        ))),
        None => Ok(()),
    }
}

// Callers guarantee `group` is non-empty (chunks/chunk_by never yield empty slices).
fn aggregate(group: &[OhlcvPoint], mode: OhlcAggregation) -> CompressedBucket {
    let first = &group[0];
    let last = &group[group.len() - 1];
    let n = group.len() as f64;

    let high = group.iter().map(|p| p.high).fold(f64::NEG_INFINITY, f64::max);
    let low = group.iter().map(|p| p.low).fold(f64::INFINITY, f64::min);
    let volume = group.iter().map(|p| p.volume).sum();

    let (open, close) = match mode {
        OhlcAggregation::Mean => (
            group.iter().map(|p| p.open).sum::<f64>() / n,
            group.iter().map(|p| p.close).sum::<f64>() / n,
        ),
        OhlcAggregation::Candlestick => (first.open, last.close),
    };

    CompressedBucket {
        time: first.time,
        open,
        high,
        low,
        close,
        volume,
        point_count: group.len(),
    }
}
