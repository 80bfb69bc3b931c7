use async_trait::async_trait;
use bytes::Bytes;
use catalog::domain::StoreConfig;
use catalog::ports::StoreClient;
use moka::Expiry;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct StoredValue {
    bytes: Bytes,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-backed fast store with per-key TTL and glob key scans.
/// One instance holds the keyspace of one entity type.
pub struct MokaStore {
    name: String,
    default_ttl: Duration,
    cache: Cache<String, StoredValue>,
}

impl MokaStore {
    pub fn new(config: &StoreConfig) -> Self {
        let mut builder = Cache::builder()
            .name(&config.name)
            .expire_after(PerEntryTtl);

        if let Some(capacity) = config.max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            name: config.name.clone(),
            default_ttl: config.default_ttl,
            cache: builder.build(),
        }
    }

    /// Applies pending evictions now instead of on the next maintenance cycle.
    #[cfg(test)]
    pub(crate) async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl StoreClient for MokaStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.cache.get(key).await.map(|v| v.bytes))
    }

    /// A zero `ttl` falls back to the store's default lifetime.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        self.cache
            .insert(key.to_string(), StoredValue { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.cache.get(key).await.map(|v| v.bytes));
        }
        Ok(values)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

impl Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("name", &self.name)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

/// Matches `text` against a pattern where `*` stands for any run of characters
/// and `?` for exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` seen and the text index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(c) if *c == '?' || *c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    pi = star + 1;
                    ti = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}
