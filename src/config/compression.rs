use crate::analysis::{BucketStrategy, OhlcAggregation};

pub struct CompressionConfig {
    /// Series at or below this many points are returned untouched.
    pub bypass_threshold: usize,
    pub strategy: BucketStrategy,
    pub aggregation: OhlcAggregation,
    /// Compression taking longer than this (micros) is logged as slow.
    pub slow_threshold_micros: u128,
}

pub const COMPRESSION: CompressionConfig = CompressionConfig {
    bypass_threshold: 100,
    strategy: BucketStrategy::PointCount,
    aggregation: OhlcAggregation::Mean,
    slow_threshold_micros: 5_000,
};
