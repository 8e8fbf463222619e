//! Redis set store
//!
//! Maps the store operations onto native set commands. `SPOP key count` is
//! atomic on the server, so concurrent pops never overlap.

use crate::frontier::traits::{ScanPage, SetStore, StoreResult};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

/// Redis set-store backend over a multiplexed connection
#[derive(Clone)]
pub struct RedisSetStore {
    conn: MultiplexedConnection,
}

impl RedisSetStore {
    /// Connects to the server at `url` (`redis://[:password@]host:port/db`)
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::debug!("Connected to Redis set store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SetStore for RedisSetStore {
    async fn pop(&self, key: &str, count: usize) -> StoreResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("SPOP")
            .arg(key)
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn add(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let added: usize = redis::cmd("SADD")
            .arg(key)
            .arg(members)
            .query_async(&mut conn)
            .await?;
        Ok(added)
    }

    async fn cardinality(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = redis::cmd("SCARD").arg(key).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn scan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        let mut conn = self.conn.clone();
        let (next, members): (u64, Vec<String>) = redis::cmd("SSCAN")
            .arg(key)
            .arg(cursor)
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await?;
        Ok(ScanPage {
            cursor: next,
            members,
        })
    }

    async fn members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
