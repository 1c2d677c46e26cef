#![allow(clippy::collapsible_if)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod utils;

// Re-export commonly used types outside of crate (for the market-cache binary)
pub use analysis::{BucketStrategy, Compressor, OhlcAggregation, compress, compress_by_interval};
pub use config::RuntimeConfig;
pub use data::{
    ChartSeries, ChartSeriesLoader, MarketDataSource, OfflineCache, RateLimiter,
    SqliteTimeSeriesStore, spawn_sweeper,
};
pub use domain::{CompressedBucket, OhlcvPoint, Timeframe};
pub use error::{MarketDataError, Result};

// CLI argument parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite file backing the offline cache
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Delete every cache entry older than the ttl
    Sweep,
    /// Compress a JSON array of OHLCV points and store it in the cache
    Compress {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "1M")]
        timeframe: String,
        /// Bucket by wall-clock interval instead of point count
        #[arg(long, default_value_t = false)]
        interval: bool,
        /// First open / last close instead of means
        #[arg(long, default_value_t = false)]
        candlestick: bool,
    },
    /// Keep sweeping stale entries in the background until Ctrl-C
    Watch {
        /// Override the configured sweep interval
        #[arg(long)]
        every_secs: Option<u64>,
    },
    /// Print a cached series as JSON
    Show {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "1M")]
        timeframe: String,
    },
}

/// Composition root for the cache: builds the store from config and initializes it.
pub async fn open_cache(config: &RuntimeConfig) -> Result<OfflineCache<SqliteTimeSeriesStore>> {
    let store = SqliteTimeSeriesStore::new(&config.db_path, config.max_connections)?;
    let cache = OfflineCache::new(store, config);
    cache.initialize().await?;
    Ok(cache)
}
