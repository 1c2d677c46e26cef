use {
    crate::{config::PERSISTENCE, error::Result},
    async_trait::async_trait,
    sqlx::{
        ConnectOptions, Pool, Row, Sqlite,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    },
    std::{str::FromStr, time::Duration},
};

/// One persisted row of the offline cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// `symbol + "-" + timeframe`
    pub id: String,
    pub symbol: String,
    pub timeframe: String,
    /// Serialized bucket payload
    pub data: Vec<u8>,
    /// Write time, epoch ms
    pub timestamp: i64,
}

/// Raw key-value persistence beneath the offline cache.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Idempotent schema setup.
    async fn initialize(&self) -> Result<()>;
    /// Inserts or overwrites the row with the same id.
    async fn write_entry(&self, entry: &CacheEntry) -> Result<()>;
    async fn read_entry(&self, id: &str) -> Result<Option<CacheEntry>>;
    async fn delete_entry(&self, id: &str) -> Result<bool>;
    /// Deletes every row with `timestamp <= cutoff_ms`, returning how many went.
    async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64>;
    async fn count_entries(&self) -> Result<u64>;
}

pub struct SqliteTimeSeriesStore {
    pool: Pool<Sqlite>,
    table: &'static str,
}

impl SqliteTimeSeriesStore {
    /// Builds a lazy pool; nothing touches the disk until `initialize`.
    /// `db_path` may carry SQLite URL parameters (`?mode=ro`); malformed ones are rejected here.
    pub fn new(db_path: &str, max_connections: u32) -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10))
            .synchronous(SqliteSynchronous::Normal)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(2));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(connection_options);

        Ok(Self {
            pool,
            table: PERSISTENCE.cache.table,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TimeSeriesStore for SqliteTimeSeriesStore {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                data BLOB NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table} (timestamp);",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (id, symbol, timeframe, data, timestamp)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                timestamp = excluded.timestamp
            "#,
            table = self.table
        ))
        .bind(&entry.id)
        .bind(&entry.symbol)
        .bind(&entry.timeframe)
        .bind(&entry.data)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read_entry(&self, id: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query(&format!(
            "SELECT id, symbol, timeframe, data, timestamp FROM {} WHERE id = ?",
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let entry = match row {
            Some(row) => Some(CacheEntry {
                id: row.try_get("id")?,
                symbol: row.try_get("symbol")?,
                timeframe: row.try_get("timeframe")?,
                data: row.try_get("data")?,
                timestamp: row.try_get("timestamp")?,
            }),
            None => None,
        };
        Ok(entry)
    }

    async fn delete_entry(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE timestamp <= ?", self.table))
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_entries(&self) -> Result<u64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }
}
