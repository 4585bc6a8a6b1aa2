//  src/redis_pool.rs
//! Thin, cheap-to-clone Redis handle, carried over from the teacher's
//! `db/redis.rs` unchanged in shape. Backs [`crate::feature_cache`]'s
//! optional durability, [`crate::job_lock::JobLock`], and
//! [`crate::result_publisher::ResultPublisher`].

use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError, ToRedisArgs};
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Instant};

#[derive(Clone)]
pub struct RedisPool {
    manager: Arc<ConnectionManager>,
}

impl RedisPool {
    pub async fn new(url: &str) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager: Arc::new(manager),
        })
    }

    pub(crate) fn manager(&self) -> Arc<ConnectionManager> {
        self.manager.clone()
    }

    pub async fn set_json<K, T>(&self, key: K, value: &T, ttl_secs: usize) -> Result<(), RedisError>
    where
        K: ToRedisArgs + Send + Sync,
        T: Serialize,
    {
        let mut con = self.manager().as_ref().clone();
        let payload = serde_json::to_string(value)
            .map_err(|e| RedisError::from((redis::ErrorKind::TypeError, "serde", e.to_string())))?;

        let started = Instant::now();
        if ttl_secs == 0 {
            redis::cmd("SET").arg(key).arg(payload).query_async::<_, ()>(&mut con).await?;
        } else {
            redis::cmd("SET")
                .arg(key)
                .arg(payload)
                .arg("EX")
                .arg(ttl_secs)
                .query_async::<_, ()>(&mut con)
                .await?;
        }
        log::debug!("redis SET took {:?}", started.elapsed());
        Ok(())
    }

    pub async fn get_json<K, T>(&self, key: K) -> Result<Option<T>, RedisError>
    where
        K: ToRedisArgs + Send + Sync,
        T: DeserializeOwned,
    {
        let mut con = self.manager().as_ref().clone();
        let started = Instant::now();
        let raw: Option<String> = con.get(key).await?;
        log::debug!("redis GET took {:?}", started.elapsed());

        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s).map_err(|e| {
                RedisError::from((redis::ErrorKind::TypeError, "serde", e.to_string()))
            })?)),
            None => Ok(None),
        }
    }

    /// `SET key value NX EX ttl` — succeeds only if `key` did not exist.
    /// Backs [`crate::job_lock::JobLock::acquire`].
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: usize) -> Result<bool, RedisError> {
        let mut con = self.manager().as_ref().clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut con)
            .await?;
        Ok(result.is_some())
    }

    pub async fn delete(&self, key: &str) -> Result<(), RedisError> {
        let mut con = self.manager().as_ref().clone();
        con.del::<_, ()>(key).await
    }

    /// Uniformly names-spaces keys: `"discovery/contenders/latest/hybrid_v1"`
    pub fn with_prefix(&self, prefix: &str, key: impl AsRef<str>) -> String {
        format!("{prefix}/{}", key.as_ref())
    }
}
