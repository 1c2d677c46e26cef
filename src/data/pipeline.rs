use std::sync::Arc;

use crate::{
    analysis::Compressor,
    data::{MarketDataSource, OfflineCache, RateLimiter, TimeSeriesStore},
    domain::{CompressedBucket, Timeframe},
    error::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrigin {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub buckets: Vec<CompressedBucket>,
    pub origin: SeriesOrigin,
}

/// Serves chart-ready series: cache first, then a rate-limited fetch that is
/// compressed and written back.
pub struct ChartSeriesLoader<S: TimeSeriesStore, P: MarketDataSource> {
    cache: Arc<OfflineCache<S>>,
    source: P,
    limiter: RateLimiter,
    compressor: Compressor,
}

impl<S: TimeSeriesStore, P: MarketDataSource> ChartSeriesLoader<S, P> {
    pub fn new(
        cache: Arc<OfflineCache<S>>,
        source: P,
        limiter: RateLimiter,
        compressor: Compressor,
    ) -> Self {
        Self {
            cache,
            source,
            limiter,
            compressor,
        }
    }

    /// Fetching fails fast with `RateLimitExceeded` when the source's quota is
    /// spent; the caller decides whether to back off and retry. A failed cache
    /// write does not fail the load.
    pub async fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<ChartSeries> {
        if let Some(buckets) = self.cache.get(symbol, timeframe).await? {
            return Ok(ChartSeries {
                symbol: symbol.to_string(),
                timeframe,
                buckets,
                origin: SeriesOrigin::Cache,
            });
        }

        self.limiter.try_consume(self.source.limiter_key()).await?;
        let points = self.source.fetch_points(symbol, timeframe).await?;
        let buckets = self.compressor.run(&points, timeframe)?;

        if let Err(e) = self.cache.put(symbol, timeframe, &buckets).await {
            log::warn!(
                "Could not cache {} {} ({} buckets), serving uncached: {}",
                symbol,
                timeframe,
                buckets.len(),
                e
            );
        }

        Ok(ChartSeries {
            symbol: symbol.to_string(),
            timeframe,
            buckets,
            origin: SeriesOrigin::Fresh,
        })
    }

    pub fn cache(&self) -> &OfflineCache<S> {
        &self.cache
    }
}
