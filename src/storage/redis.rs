//! Redis key-value backend
//!
//! Keys are namespaced under a configurable prefix so several engines can
//! share one Redis database.

use super::kv::KvStore;
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

/// Redis-backed store
#[derive(Clone)]
pub struct RedisKvStore {
    connection: MultiplexedConnection,
    namespace: String,
}

impl std::fmt::Debug for RedisKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl RedisKvStore {
    /// Connect to Redis
    pub async fn connect(url: &str, namespace: &str) -> Result<Self> {
        info!("Connecting Redis key-value store");
        debug!("Redis URL: {}", Self::sanitize_url(url));

        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            connection,
            namespace: namespace.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Escape glob metacharacters so a prefix matches literally in SCAN
    fn escape_pattern(input: &str) -> String {
        let mut escaped = String::with_capacity(input.len());
        for c in input.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    /// Strip credentials before logging a URL
    fn sanitize_url(url: &str) -> String {
        match url.rfind('@') {
            Some(at) => match url.find("://") {
                Some(scheme_end) => format!("{}://***@{}", &url[..scheme_end], &url[at + 1..]),
                None => "***".to_string(),
            },
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set(self.full_key(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.full_key(key)).await?;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let pattern = format!(
            "{}*",
            Self::escape_pattern(&self.full_key(prefix))
        );
        let strip = format!("{}:", self.namespace);

        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut conn)
                .await
                .map_err(BatchError::Redis)?;

            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&strip).map(str::to_string)),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
