//! Offline cache persistence configuration
use crate::utils::TimeUtils;

/// Configuration for the compressed time-series cache
pub struct CachePersistenceConfig {
    /// SQLite file holding the cache
    pub db_path: &'static str,
    /// Table storing one row per (symbol, timeframe)
    pub table: &'static str,
    /// Entries older than this are invalid
    pub ttl_ms: i64,
    /// How often the background sweeper runs
    pub sweep_interval_ms: i64,
    /// Upper bound on any single store operation
    pub op_timeout_ms: u64,
    pub max_connections: u32,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub cache: CachePersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    cache: CachePersistenceConfig {
        db_path: "market_cache.sqlite",
        table: "time_series",
        ttl_ms: TimeUtils::MS_IN_D,
        sweep_interval_ms: TimeUtils::MS_IN_H,
        op_timeout_ms: 10_000,
        max_connections: 5,
    },
};

/// Primary key of a cache row. Example: "SPIDEY-1M"
pub fn cache_key(symbol: &str, timeframe: &str) -> String {
    format!("{}-{}", symbol, timeframe)
}
