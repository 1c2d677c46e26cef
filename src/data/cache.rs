//! Offline cache of compressed chart series.
//!
//! Entries are valid while `now - timestamp < ttl`. Expiry happens on two
//! independent paths: `get` deletes the stale entry it finds, and `sweep`
//! deletes every stale entry whether or not it was ever read.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::{
    config::{DF, RuntimeConfig, cache_key},
    data::storage::{CacheEntry, TimeSeriesStore},
    domain::{CompressedBucket, Timeframe},
    error::{MarketDataError, Result},
    utils::{Clock, SystemClock, epoch_ms_to_utc, format_duration},
};

pub struct OfflineCache<S: TimeSeriesStore> {
    store: S,
    ready: OnceCell<()>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    op_timeout: Duration,
}

impl<S: TimeSeriesStore> OfflineCache<S> {
    pub fn new(store: S, config: &RuntimeConfig) -> Self {
        Self {
            store,
            ready: OnceCell::new(),
            clock: Arc::new(SystemClock),
            ttl_ms: config.cache_ttl.as_millis() as i64,
            op_timeout: config.op_timeout,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound every store round-trip. An elapsed timeout surfaces as `Storage`.
    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Creates the backing table. Concurrent callers share one setup; a failed
    /// setup leaves the cache uninitialized so a later call can retry.
    pub async fn initialize(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                self.bounded(self.store.initialize()).await?;
                log::info!("Offline cache ready (ttl {})", format_duration(self.ttl_ms));
                Ok::<(), MarketDataError>(())
            })
            .await?;
        Ok(())
    }

    /// Serializes `data` and overwrites the entry for (symbol, timeframe).
    /// Storage failures propagate so the caller knows nothing was persisted.
    pub async fn put(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        data: &[CompressedBucket],
    ) -> Result<()> {
        self.ensure_ready()?;

        let entry = CacheEntry {
            id: cache_key(symbol, timeframe.label()),
            symbol: symbol.to_string(),
            timeframe: timeframe.label().to_string(),
            data: bincode::serialize(data)?,
            timestamp: self.clock.now_ms(),
        };

        self.bounded(self.store.write_entry(&entry)).await
    }

    /// Returns the cached series, or `None` on a miss.
    ///
    /// Expired entries are deleted and reported as a miss. Storage and decode
    /// failures are logged and also reported as a miss; only an uninitialized
    /// cache is an error here.
    pub async fn get(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Vec<CompressedBucket>>> {
        self.ensure_ready()?;
        let id = cache_key(symbol, timeframe.label());

        let entry = match self.bounded(self.store.read_entry(&id)).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                #[cfg(debug_assertions)]
                if DF.log_cache {
                    log::debug!("Cache miss for {}", id);
                }
                return Ok(None);
            }
            Err(e) => {
                log::warn!("Cache read failed for {}, treating as miss: {}", id, e);
                return Ok(None);
            }
        };

        let age_ms = self.clock.now_ms() - entry.timestamp;
        if age_ms >= self.ttl_ms {
            #[cfg(debug_assertions)]
            if DF.log_cache {
                log::info!(
                    "Cache entry {} written {} expired ({} old), deleting",
                    id,
                    epoch_ms_to_utc(entry.timestamp),
                    format_duration(age_ms)
                );
            }
            if let Err(e) = self.bounded(self.store.delete_entry(&id)).await {
                log::warn!("Failed to delete expired cache entry {}: {}", id, e);
            }
            return Ok(None);
        }

        match bincode::deserialize::<Vec<CompressedBucket>>(&entry.data) {
            Ok(buckets) => Ok(Some(buckets)),
            Err(e) => {
                log::warn!("Cache entry {} is corrupted, discarding: {}", id, e);
                if let Err(e) = self.bounded(self.store.delete_entry(&id)).await {
                    log::warn!("Failed to delete corrupted cache entry {}: {}", id, e);
                }
                Ok(None)
            }
        }
    }

    /// Deletes every entry older than the ttl, returning how many were removed.
    pub async fn sweep(&self) -> Result<u64> {
        self.ensure_ready()?;
        let cutoff = self.clock.now_ms() - self.ttl_ms;
        let removed = self.bounded(self.store.delete_older_than(cutoff)).await?;
        if removed > 0 {
            log::info!("Cache sweep removed {} stale entries", removed);
        }
        Ok(removed)
    }

    pub async fn len(&self) -> Result<u64> {
        self.ensure_ready()?;
        self.bounded(self.store.count_entries()).await
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.ready.initialized() {
            Ok(())
        } else {
            Err(MarketDataError::Configuration(
                "Offline cache used before initialize()".to_string(),
            ))
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.op_timeout, op).await?
    }
}

/// Runs `sweep` every `every` until the returned handle is aborted.
/// A zero period is raised to one millisecond.
pub fn spawn_sweeper<S>(cache: Arc<OfflineCache<S>>, every: Duration) -> tokio::task::JoinHandle<()>
where
    S: TimeSeriesStore + 'static,
{
    let every = if every.is_zero() {
        log::warn!("Sweep interval of zero requested, using 1ms");
        Duration::from_millis(1)
    } else {
        every
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = cache.sweep().await {
                log::error!("Scheduled cache sweep failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::SqliteTimeSeriesStore;
    use crate::utils::{ManualClock, TimeUtils};
    use async_trait::async_trait;
    use tempfile::{TempDir, tempdir};

    const T0: i64 = 1_700_000_000_000;

    fn buckets() -> Vec<CompressedBucket> {
        vec![
            CompressedBucket {
                time: T0,
                open: 10.0,
                high: 12.0,
                low: 9.5,
                close: 11.0,
                volume: 300.0,
                point_count: 60,
            },
            CompressedBucket {
                time: T0 + TimeUtils::MS_IN_H,
                open: 11.0,
                high: 11.5,
                low: 10.0,
                close: 10.5,
                volume: 120.0,
                point_count: 30,
            },
        ]
    }

    fn sqlite_cache() -> (OfflineCache<SqliteTimeSeriesStore>, ManualClock, TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("cache.sqlite");
        let store = SqliteTimeSeriesStore::new(db_path.to_str().unwrap(), 2).unwrap();
        let clock = ManualClock::new(T0);
        let cache = OfflineCache::new(store, &RuntimeConfig::default())
            .with_clock(Arc::new(clock.clone()));
        (cache, clock, temp_dir)
    }

    #[tokio::test]
    async fn operations_before_initialize_are_configuration_errors() {
        let (cache, _clock, _dir) = sqlite_cache();
        assert!(!cache.is_initialized());
        assert!(matches!(
            cache.get("SPIDEY", Timeframe::M1).await.unwrap_err(),
            MarketDataError::Configuration(_)
        ));
        assert!(matches!(
            cache.put("SPIDEY", Timeframe::M1, &buckets()).await.unwrap_err(),
            MarketDataError::Configuration(_)
        ));
        assert!(matches!(
            cache.sweep().await.unwrap_err(),
            MarketDataError::Configuration(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_initialize_is_idempotent() {
        let (cache, _clock, _dir) = sqlite_cache();
        let (a, b) = tokio::join!(cache.initialize(), cache.initialize());
        a.unwrap();
        b.unwrap();
        cache.initialize().await.unwrap();
        assert!(cache.is_initialized());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (cache, _clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache.put("SPIDEY", Timeframe::M1, &buckets()).await.unwrap();
        assert_eq!(cache.get("SPIDEY", Timeframe::M1).await.unwrap(), Some(buckets()));
        assert_eq!(cache.get("SPIDEY", Timeframe::W1).await.unwrap(), None);
        assert_eq!(cache.get("BATS", Timeframe::M1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_and_refreshes_timestamp() {
        let (cache, clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache.put("SPIDEY", Timeframe::M1, &buckets()).await.unwrap();

        clock.advance_ms(20 * TimeUtils::MS_IN_H);
        let newer = &buckets()[..1];
        cache.put("SPIDEY", Timeframe::M1, newer).await.unwrap();

        // 30h after the first write, 10h after the second
        clock.advance_ms(10 * TimeUtils::MS_IN_H);
        assert_eq!(cache.get("SPIDEY", Timeframe::M1).await.unwrap(), Some(newer.to_vec()));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_deleted_on_read() {
        let (cache, clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache.put("SPIDEY", Timeframe::M1, &buckets()).await.unwrap();

        clock.advance_ms(TimeUtils::MS_IN_D - 1);
        assert!(cache.get("SPIDEY", Timeframe::M1).await.unwrap().is_some());

        clock.advance_ms(1);
        assert!(cache.get("SPIDEY", Timeframe::M1).await.unwrap().is_none());
        assert!(cache.store().read_entry("SPIDEY-1M").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_removes_unread_stale_entries_only() {
        let (cache, clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache.put("OLD1", Timeframe::D1, &buckets()).await.unwrap();
        cache.put("OLD2", Timeframe::Y1, &buckets()).await.unwrap();

        clock.advance_ms(TimeUtils::MS_IN_D + TimeUtils::MS_IN_H);
        cache.put("FRESH", Timeframe::M1, &buckets()).await.unwrap();

        assert_eq!(cache.sweep().await.unwrap(), 2);
        assert_eq!(cache.len().await.unwrap(), 1);
        assert!(cache.get("FRESH", Timeframe::M1).await.unwrap().is_some());
        assert_eq!(cache.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupted_payload_reads_as_miss() {
        let (cache, _clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache
            .store()
            .write_entry(&CacheEntry {
                id: "SPIDEY-1M".to_string(),
                symbol: "SPIDEY".to_string(),
                timeframe: "1M".to_string(),
                data: vec![0xff, 0x01],
                timestamp: T0,
            })
            .await
            .unwrap();
        assert!(cache.get("SPIDEY", Timeframe::M1).await.unwrap().is_none());
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    /// Store whose reads and writes always fail, as if the disk were full.
    struct BrokenStore;

    #[async_trait]
    impl TimeSeriesStore for BrokenStore {
        async fn initialize(&self) -> Result<()> {
            Ok(())
        }
        async fn write_entry(&self, _entry: &CacheEntry) -> Result<()> {
            Err(MarketDataError::Storage("quota exceeded".into()))
        }
        async fn read_entry(&self, _id: &str) -> Result<Option<CacheEntry>> {
            Err(MarketDataError::Storage("store unavailable".into()))
        }
        async fn delete_entry(&self, _id: &str) -> Result<bool> {
            Err(MarketDataError::Storage("store unavailable".into()))
        }
        async fn delete_older_than(&self, _cutoff_ms: i64) -> Result<u64> {
            Err(MarketDataError::Storage("store unavailable".into()))
        }
        async fn count_entries(&self) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn storage_failures_miss_on_read_but_propagate_on_write() {
        let cache = OfflineCache::new(BrokenStore, &RuntimeConfig::default());
        cache.initialize().await.unwrap();
        assert_eq!(cache.get("SPIDEY", Timeframe::M1).await.unwrap(), None);

        let err = cache.put("SPIDEY", Timeframe::M1, &buckets()).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Storage(_)));
        assert!(cache.sweep().await.is_err());
    }

    /// Store that never answers, except possibly for schema setup.
    struct HangingStore {
        answers_initialize: bool,
    }

    #[async_trait]
    impl TimeSeriesStore for HangingStore {
        async fn initialize(&self) -> Result<()> {
            if self.answers_initialize {
                return Ok(());
            }
            std::future::pending().await
        }
        async fn write_entry(&self, _entry: &CacheEntry) -> Result<()> {
            std::future::pending().await
        }
        async fn read_entry(&self, _id: &str) -> Result<Option<CacheEntry>> {
            std::future::pending().await
        }
        async fn delete_entry(&self, _id: &str) -> Result<bool> {
            std::future::pending().await
        }
        async fn delete_older_than(&self, _cutoff_ms: i64) -> Result<u64> {
            std::future::pending().await
        }
        async fn count_entries(&self) -> Result<u64> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_times_out_and_stays_uninitialized() {
        let store = HangingStore {
            answers_initialize: false,
        };
        let cache = OfflineCache::new(store, &RuntimeConfig::default())
            .with_timeout(Duration::from_millis(50));
        let err = cache.initialize().await.unwrap_err();
        assert!(matches!(err, MarketDataError::Storage(_)));
        assert!(!cache.is_initialized());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out_into_miss_on_read_and_error_on_write() {
        let store = HangingStore {
            answers_initialize: true,
        };
        let cache = OfflineCache::new(store, &RuntimeConfig::default())
            .with_timeout(Duration::from_millis(50));
        cache.initialize().await.unwrap();

        assert_eq!(cache.get("SPIDEY", Timeframe::M1).await.unwrap(), None);

        let err = cache.put("SPIDEY", Timeframe::M1, &buckets()).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Storage(_)));
        assert!(matches!(cache.sweep().await, Err(MarketDataError::Storage(_))));
    }

    #[tokio::test]
    async fn background_sweeper_clears_stale_entries() {
        let (cache, clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache.put("OLD", Timeframe::D1, &buckets()).await.unwrap();
        clock.advance_ms(2 * TimeUtils::MS_IN_D);

        let cache = Arc::new(cache);
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(10));
        for _ in 0..100 {
            if cache.len().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn zero_sweep_interval_is_clamped_not_fatal() {
        let (cache, clock, _dir) = sqlite_cache();
        cache.initialize().await.unwrap();
        cache.put("OLD", Timeframe::D1, &buckets()).await.unwrap();
        clock.advance_ms(2 * TimeUtils::MS_IN_D);

        let cache = Arc::new(cache);
        let handle = spawn_sweeper(cache.clone(), Duration::ZERO);
        for _ in 0..100 {
            if cache.len().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!handle.is_finished());
        handle.abort();
        assert_eq!(cache.len().await.unwrap(), 0);
    }
}
