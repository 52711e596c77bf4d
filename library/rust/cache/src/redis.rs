use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};

use crate::{CacheEntry, CacheError, CacheKey, CacheTag, OutputCacheStore};

const DEFAULT_PREFIX: &str = "movies:output-cache";

/// タグ集合に含まれるエントリとタグ集合自体を 1 つのスクリプトで削除する。
const EVICT_BY_TAG_SCRIPT: &str = r#"
local keys = redis.call('SMEMBERS', KEYS[1])
local removed = 0
for _, k in ipairs(keys) do
    removed = removed + redis.call('DEL', k)
end
redis.call('DEL', KEYS[1])
return removed
"#;

/// エントリを書き込み、上書き前のタグ集合からは取り除く。
///
/// KEYS[1]: エントリキー / ARGV: payload, タグ（カンマ区切り）, TTL(ms), タグキーの接頭辞
/// タグ集合の TTL は延ばす方向にだけ更新する（短い TTL の書き込みで集合ごと消えないように）。
const SET_ENTRY_SCRIPT: &str = r#"
local old = redis.call('HGET', KEYS[1], 'tags')
if old then
    for t in string.gmatch(old, '[^,]+') do
        redis.call('SREM', ARGV[4] .. t, KEYS[1])
    end
end
redis.call('DEL', KEYS[1])
redis.call('HSET', KEYS[1], 'payload', ARGV[1], 'tags', ARGV[2])
redis.call('PEXPIRE', KEYS[1], ARGV[3])
local ttl = tonumber(ARGV[3])
for t in string.gmatch(ARGV[2], '[^,]+') do
    local tag_key = ARGV[4] .. t
    redis.call('SADD', tag_key, KEYS[1])
    if redis.call('PTTL', tag_key) < ttl then
        redis.call('PEXPIRE', tag_key, ttl)
    end
end
return 1
"#;

/// Redis-backed output cache store.
///
/// Each entry is a hash (`payload`, `tags`) with a PX expiry, and each tag is a
/// set of entry keys. Writes and tag eviction run as Lua scripts so concurrent
/// readers never observe a partially written entry or a partially evicted tag.
#[derive(Clone)]
pub struct RedisOutputCacheStore {
    conn: MultiplexedConnection,
    key_prefix: String,
    set_script: Arc<Script>,
    evict_script: Arc<Script>,
}

impl RedisOutputCacheStore {
    /// Create a new store from a Redis URL (e.g. "redis://127.0.0.1:6379").
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_PREFIX.to_string(),
            set_script: Arc::new(Script::new(SET_ENTRY_SCRIPT)),
            evict_script: Arc::new(Script::new(EVICT_BY_TAG_SCRIPT)),
        }
    }

    /// Set a key prefix for namespace isolation.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn entry_key(&self, key: &CacheKey) -> String {
        format!("{}:entry:{}", self.key_prefix, key)
    }

    fn tag_prefix(&self) -> String {
        format!("{}:tag:", self.key_prefix)
    }

    fn tag_key(&self, tag: &CacheTag) -> String {
        format!("{}{}", self.tag_prefix(), tag)
    }
}

#[async_trait]
impl OutputCacheStore for RedisOutputCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let mut conn = self.conn.clone();
        let full_key = self.entry_key(key);

        let (payload, tags, pttl): (Option<Vec<u8>>, Option<String>, i64) = redis::pipe()
            .cmd("HGET")
            .arg(&full_key)
            .arg("payload")
            .cmd("HGET")
            .arg(&full_key)
            .arg("tags")
            .cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        // PTTL: -2 はキーなし、-1 は期限なし（このストアでは書き込まない）
        if pttl <= 0 {
            return Ok(None);
        }

        let tags = decode_tags(tags.as_deref());
        Ok(Some(Arc::new(CacheEntry {
            key: key.clone(),
            payload,
            tags,
            expires_at: Instant::now() + Duration::from_millis(pttl as u64),
        })))
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let full_key = self.entry_key(&entry.key);
        let ttl_ms = entry
            .expires_at
            .saturating_duration_since(Instant::now())
            .as_millis() as u64;
        if ttl_ms == 0 {
            return Ok(());
        }

        let _: i64 = self
            .set_script
            .key(&full_key)
            .arg(entry.payload.as_slice())
            .arg(encode_tags(&entry.tags))
            .arg(ttl_ms)
            .arg(self.tag_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let count: i64 = redis::cmd("DEL")
            .arg(self.entry_key(key))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(count > 0)
    }

    async fn evict_by_tag(&self, tag: &CacheTag) -> Result<usize, CacheError> {
        let mut conn = self.conn.clone();
        let removed: usize = self
            .evict_script
            .key(self.tag_key(tag))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::InvalidationFailed {
                tag: tag.to_string(),
                reason: e.to_string(),
            })?;
        Ok(removed)
    }
}

fn encode_tags(tags: &[CacheTag]) -> String {
    tags.iter()
        .map(CacheTag::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_tags(raw: Option<&str>) -> Vec<CacheTag> {
    raw.unwrap_or_default()
        .split(',')
        .filter(|t| !t.is_empty())
        .map(CacheTag::new)
        .collect()
}

fn map_redis_error(err: RedisError) -> CacheError {
    CacheError::ConnectionError(err.to_string())
}
