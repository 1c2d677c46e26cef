use async_trait::async_trait;

use crate::{
    domain::{OhlcvPoint, Timeframe},
    error::Result,
};

/// Abstract interface for fetching raw price history.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Rate limiter key guarding this source's upstream calls.
    fn limiter_key(&self) -> &str;

    /// Points for `symbol` covering `timeframe`, ordered by time ascending.
    async fn fetch_points(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<OhlcvPoint>>;
}
