// Domain types and value objects
mod ohlcv;
mod timeframe;

// Re-export commonly used types to the world
pub use ohlcv::{CompressedBucket, OhlcvPoint};
pub use timeframe::Timeframe;
