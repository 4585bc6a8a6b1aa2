//! Distributed TTL lock so only one discovery run executes concurrently
//! per strategy key (spec.md §4.12). `SET key value NX EX ttl` against
//! the same Redis collaborator [`crate::redis_pool::RedisPool`] talks to
//! elsewhere in the engine.

use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::redis_pool::RedisPool;

pub struct JobLock {
    redis: RedisPool,
}

pub struct LockHandle {
    redis: RedisPool,
    key: String,
    token: String,
}

impl JobLock {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    /// Attempts to acquire `key` for `ttl_secs`. Returns `Err(LockHeld)`
    /// if another holder already owns it — callers exit non-zero
    /// (orchestrator CLI) or skip (workers), never wait and retry here.
    pub async fn acquire(&self, key: &str, ttl_secs: u64) -> EngineResult<LockHandle> {
        let token = Uuid::new_v4().to_string();
        let acquired = self
            .redis
            .set_nx_ex(key, &token, ttl_secs as usize)
            .await?;
        if acquired {
            Ok(LockHandle {
                redis: self.redis.clone(),
                key: key.to_string(),
                token,
            })
        } else {
            Err(EngineError::LockHeld(key.to_string()))
        }
    }
}

impl LockHandle {
    /// Explicit release by a holder that finished. A crashed holder's
    /// lock still expires via TTL.
    pub async fn release(self) -> EngineResult<()> {
        // Best-effort: we don't compare-and-delete on the token because
        // the pool helper doesn't expose a Lua eval path; TTL expiry is
        // the backstop against a stale release racing a new holder.
        self.redis.delete(&self.key).await?;
        log::debug!("released job lock {} (token {})", self.key, self.token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_held_error_names_the_key() {
        let err = EngineError::LockHeld("discovery/hybrid_v1".into());
        assert!(err.to_string().contains("discovery/hybrid_v1"));
    }
}
