use std::time::Duration;

use crate::analysis::{BucketStrategy, OhlcAggregation};
use crate::config::{API_QUOTAS, COMPRESSION, PERSISTENCE};

/// Owned settings handed to the composition root. Starts from the const
/// blueprints and lets the binary (or a test) override individual fields.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_path: String,
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    pub op_timeout: Duration,
    pub max_connections: u32,
    pub bypass_threshold: usize,
    pub strategy: BucketStrategy,
    pub aggregation: OhlcAggregation,
    pub http_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let cache = &PERSISTENCE.cache;
        Self {
            db_path: cache.db_path.to_string(),
            cache_ttl: Duration::from_millis(cache.ttl_ms as u64),
            sweep_interval: Duration::from_millis(cache.sweep_interval_ms as u64),
            op_timeout: Duration::from_millis(cache.op_timeout_ms),
            max_connections: cache.max_connections,
            bypass_threshold: COMPRESSION.bypass_threshold,
            strategy: COMPRESSION.strategy,
            aggregation: COMPRESSION.aggregation,
            http_timeout: Duration::from_millis(API_QUOTAS.client.timeout_ms),
        }
    }
}

impl RuntimeConfig {
    pub fn with_db_path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn with_strategy(mut self, strategy: BucketStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_aggregation(mut self, aggregation: OhlcAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }
}
