//! Configuration module for the market data core.

// Can all be private now because we have a public re-export.
mod api;
mod compression;
mod debug;
mod persistence;
mod runtime;

// Re-export commonly used items
pub use api::{API_QUOTAS, ApiEndpoint, ApiQuota, ApiQuotaConfig};
pub use compression::{COMPRESSION, CompressionConfig};
pub use debug::{DF, LOG_PERFORMANCE};
pub use persistence::{PERSISTENCE, cache_key};
pub use runtime::RuntimeConfig;
