//! Redis-backed fingerprint store.

use super::{FingerprintRecord, FingerprintStore};
use crate::error::SessionError;
use crate::refresh::Fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

const KEY_PREFIX: &str = "refresh_fp";

/// Fingerprint store on Redis.
///
/// `SET NX PX` gives insert-if-absent with a server-side TTL and `GETDEL`
/// gives the atomic take, so single-use holds across service replicas.
pub struct RedisFingerprintStore {
    conn: ConnectionManager,
}

impl RedisFingerprintStore {
    /// Connect to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StoreUnavailable`] if the connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(RedisFingerprintStore { conn })
    }

    fn key(fingerprint: &Fingerprint) -> String {
        format!("{}:{}", KEY_PREFIX, fingerprint.to_key())
    }
}

#[async_trait]
impl FingerprintStore for RedisFingerprintStore {
    #[instrument(skip_all)]
    async fn put(
        &self,
        fingerprint: &Fingerprint,
        record: &FingerprintRecord,
    ) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let key = Self::key(fingerprint);
        let value = serde_json::to_string(record)?;
        let ttl_ms = (record.expires_at - record.created_at).num_milliseconds().max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;

        match reply {
            Some(_) => Ok(()),
            None => Err(SessionError::FingerprintConflict),
        }
    }

    #[instrument(skip_all)]
    async fn take_if_valid(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<Option<FingerprintRecord>, SessionError> {
        let mut conn = self.conn.clone();
        let key = Self::key(fingerprint);

        let value: Option<String> = redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;

        let Some(value) = value else {
            return Ok(None);
        };

        let record: FingerprintRecord = serde_json::from_str(&value)?;
        if !record.is_valid_at(now) {
            debug!("Fingerprint past expiry before server-side TTL fired");
            return Ok(None);
        }

        Ok(Some(record))
    }
}
