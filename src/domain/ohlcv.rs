use serde::{Deserialize, Serialize};

/// One raw price sample as produced by the upstream market-data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvPoint {
    /// Epoch milliseconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvPoint {
    // A constructor for convenience
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Aggregate of consecutive points covering one output interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressedBucket {
    /// Time of the first constituent point
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// How many raw points were folded into this bucket
    pub point_count: usize,
}

impl CompressedBucket {
    // True when open and close sit inside the high/low range.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

impl From<&OhlcvPoint> for CompressedBucket {
    fn from(p: &OhlcvPoint) -> Self {
        CompressedBucket {
            time: p.time,
            open: p.open,
            high: p.high,
            low: p.low,
            close: p.close,
            volume: p.volume,
            point_count: 1,
        }
    }
}
