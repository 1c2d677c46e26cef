//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Log every admitted permit, not just saturation.
    pub log_rate_limiter: bool,

    /// Log cache hits, misses and lazy expiries.
    pub log_cache: bool,

    pub log_compression: bool,

    /// Activate trace_time macro (for cool scope-level timing)
    pub log_performance: bool,
}

pub const DF: LogFlags = LogFlags {
    log_rate_limiter: false,
    log_cache: true,
    log_compression: false,
    log_performance: true,
};

pub const LOG_PERFORMANCE: bool = DF.log_performance;
