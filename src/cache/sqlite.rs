use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::Value;
use tracing::debug;

use crate::cache::schema::cache_entries;
use crate::cache::Cache;
use crate::error::{LedgerPilotError, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

#[derive(Queryable)]
struct CacheRow {
    value: String,
    expires_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = cache_entries)]
struct NewCacheEntry<'a> {
    cache_key: &'a str,
    value: &'a str,
    expires_at: i64,
}

/// Durable tier. Keys are stored under `<namespace>/<key>` so several wallets
/// can share one database file; `expires_at` is unix milliseconds.
pub struct SqliteCache {
    pool: SqlitePool,
    namespace: String,
}

impl SqliteCache {
    pub async fn open(sqlite_path: impl AsRef<str>, namespace: impl Into<String>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| LedgerPilotError::Storage(e.to_string()))?;
        Ok(Self {
            pool,
            namespace: namespace.into(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| LedgerPilotError::Storage(e.to_string()))
    }
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let scoped = self.scoped(key);
        let mut conn = self.conn().await?;
        let row: Option<CacheRow> = cache_entries::table
            .filter(cache_entries::cache_key.eq(scoped.as_str()))
            .select((cache_entries::value, cache_entries::expires_at))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LedgerPilotError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        if row.expires_at <= now_ms() {
            debug!(key = %scoped, "durable cache entry expired");
            diesel::delete(cache_entries::table.filter(cache_entries::cache_key.eq(scoped.as_str())))
                .execute(&mut conn)
                .await
                .map_err(|e| LedgerPilotError::Storage(e.to_string()))?;
            return Ok(None);
        }

        serde_json::from_str(&row.value)
            .map(Some)
            .map_err(|e| LedgerPilotError::Storage(format!("corrupt cache entry {scoped}: {e}")))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let scoped = self.scoped(key);
        let encoded = serde_json::to_string(&value)
            .map_err(|e| LedgerPilotError::Serialization(e.to_string()))?;
        let expires_at = now_ms().saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);

        let mut conn = self.conn().await?;
        diesel::replace_into(cache_entries::table)
            .values(&NewCacheEntry {
                cache_key: &scoped,
                value: &encoded,
                expires_at,
            })
            .execute(&mut conn)
            .await
            .map_err(|e| LedgerPilotError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LedgerPilotError::Storage(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| LedgerPilotError::Storage(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| LedgerPilotError::Storage(e.to_string()))?;
        Ok::<_, LedgerPilotError>(())
    })
    .await
    .map_err(|e| LedgerPilotError::Storage(e.to_string()))??;
    Ok(())
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
