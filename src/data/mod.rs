mod cache;
mod client;
mod pipeline;
mod provider;
mod rate_limiter;
mod storage;

pub use {
    cache::{OfflineCache, spawn_sweeper},
    client::{ExternalApi, RateLimitedClient},
    pipeline::{ChartSeries, ChartSeriesLoader, SeriesOrigin},
    provider::MarketDataSource,
    rate_limiter::{LimiterSnapshot, RateLimiter},
    storage::{CacheEntry, SqliteTimeSeriesStore, TimeSeriesStore},
};
