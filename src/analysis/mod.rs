mod compression;

pub use compression::{BucketStrategy, Compressor, OhlcAggregation, compress, compress_by_interval};
