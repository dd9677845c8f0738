use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::keys::oidc_state_key;

/// Lifetime of a pending login, in seconds.
pub const OIDC_STATE_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingLogin {
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_hint: Option<String>,
}

/// Pending authorization-code logins, keyed by their `state` parameter.
pub struct OidcStateOperations;

impl OidcStateOperations {
    pub async fn store(
        redis: &Arc<RedisClient>,
        state: &str,
        pending: &PendingLogin,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let json = serde_json::to_string(pending).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::IoError, "serialization error", e.to_string()))
        })?;

        let _: () = conn
            .set_ex(oidc_state_key(state), json, OIDC_STATE_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Returns the pending login and deletes it, so a `state` works once.
    pub async fn take(
        redis: &Arc<RedisClient>,
        state: &str,
    ) -> Result<Option<PendingLogin>, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let stored: Option<String> = redis::cmd("GETDEL")
            .arg(oidc_state_key(state))
            .query_async(&mut conn)
            .await?;

        match stored {
            Some(json) => {
                let pending = serde_json::from_str(&json).map_err(|e| {
                    redis::RedisError::from((
                        redis::ErrorKind::IoError,
                        "deserialization error",
                        e.to_string(),
                    ))
                })?;
                Ok(Some(pending))
            }
            None => Ok(None),
        }
    }
}
