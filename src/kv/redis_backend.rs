use super::{
    schema::*, DomainRecord, KvBackend, KvError, ReadyDomain, VisitedFields,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The production [`KvBackend`]: a pipelined client over a Redis-compatible
/// store with the `RedisBloom` module loaded (for `BF.ADD`/`BF.EXISTS`).
///
/// Holds `shard_count` independent `ConnectionManager`s against the same
/// Redis endpoint (spec §2: "pipelining, sharded routing by domain").
/// Every domain-keyed call routes to `hash(domain) % shard_count`, so one
/// hot domain's pipeline can't head-of-line block another's on the same
/// multiplexed connection; calls against the global keys (ready-domain
/// queue, bloom filter, schema version, visited records) always use shard
/// 0, since those keys aren't domain-partitioned. Each `ConnectionManager`
/// already retries transient disconnects on its own, so no reconnect loop
/// is needed here either.
#[derive(Clone)]
pub struct RedisKv {
    shards: Vec<ConnectionManager>,
}

impl RedisKv {
    /// Opens `shard_count` connections against `url` (minimum 1).
    pub async fn connect(url: &str, shard_count: u32) -> Result<Self, KvError> {
        let shard_count = shard_count.max(1);
        let client = redis::Client::open(url).map_err(|e| KvError::Connection(e.to_string()))?;
        let mut shards = Vec::with_capacity(shard_count as usize);
        for _ in 0..shard_count {
            let conn = client
                .get_connection_manager()
                .await
                .map_err(|e| KvError::Connection(e.to_string()))?;
            shards.push(conn);
        }
        Ok(Self { shards })
    }

    fn shard_for(&self, domain: &str) -> ConnectionManager {
        let mut hasher = DefaultHasher::new();
        domain.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        self.shards[index].clone()
    }

    fn global_conn(&self) -> ConnectionManager {
        self.shards[0].clone()
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    async fn schema_version(&self) -> Result<Option<u32>, KvError> {
        let mut conn = self.global_conn();
        let value: Option<u32> = conn.get(KEY_SCHEMA_VERSION).await?;
        Ok(value)
    }

    async fn set_schema_version(&self, version: u32) -> Result<(), KvError> {
        let mut conn = self.global_conn();
        conn.set(KEY_SCHEMA_VERSION, version).await?;
        Ok(())
    }

    async fn get_domain(&self, domain: &str) -> Result<DomainRecord, KvError> {
        let mut conn = self.shard_for(domain);
        let pairs: Vec<(String, String)> = conn.hgetall(domain_key(domain)).await?;
        Ok(domain_record_from_pairs(pairs))
    }

    async fn admit_domain_batch(
        &self,
        domain: &str,
        file_path: &str,
        urls: &[String],
        bytes_written: u64,
        now: f64,
    ) -> Result<(), KvError> {
        let mut conn = self.shard_for(domain);
        let key = domain_key(domain);
        let mut pipe = redis::pipe();
        pipe.atomic();

        for url in urls {
            pipe.cmd("BF.ADD").arg(KEY_SEEN_BLOOM).arg(url).ignore();
        }

        pipe.cmd("HINCRBY")
            .arg(&key)
            .arg(FIELD_FRONTIER_SIZE)
            .arg(bytes_written)
            .ignore();
        pipe.cmd("HSETNX")
            .arg(&key)
            .arg(FIELD_FILE_PATH)
            .arg(file_path)
            .ignore();
        pipe.cmd("HSETNX")
            .arg(&key)
            .arg(FIELD_IS_SEEDED)
            .arg(0)
            .ignore();
        pipe.cmd("SADD").arg(KEY_DOMAINS_INDEX).arg(domain).ignore();
        pipe.cmd("ZADD")
            .arg(KEY_DOMAINS_QUEUE)
            .arg("LT")
            .arg(now)
            .arg(domain)
            .ignore();

        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn pop_ready_domain(&self) -> Result<Option<ReadyDomain>, KvError> {
        let mut conn = self.global_conn();
        let reply: Vec<(String, f64)> = conn.zpopmin(KEY_DOMAINS_QUEUE, 1).await?;
        Ok(reply
            .into_iter()
            .next()
            .map(|(domain, next_fetch_time)| ReadyDomain {
                domain,
                next_fetch_time,
            }))
    }

    async fn reinsert_domain(&self, domain: &str, score: f64) -> Result<(), KvError> {
        let mut conn = self.global_conn();
        conn.zadd(KEY_DOMAINS_QUEUE, domain, score).await?;
        Ok(())
    }

    async fn set_frontier_offset(&self, domain: &str, offset: u64) -> Result<(), KvError> {
        let mut conn = self.shard_for(domain);
        conn.hset(domain_key(domain), FIELD_FRONTIER_OFFSET, offset)
            .await?;
        Ok(())
    }

    async fn reset_frontier(&self, domain: &str, offset: u64, size: u64) -> Result<(), KvError> {
        let mut conn = self.shard_for(domain);
        let key = domain_key(domain);
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset(&key, FIELD_FRONTIER_OFFSET, offset).ignore();
        pipe.hset(&key, FIELD_FRONTIER_SIZE, size).ignore();
        pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn record_fetch_and_reschedule(
        &self,
        domain: &str,
        next_fetch_time: f64,
    ) -> Result<(), KvError> {
        let mut conn = self.shard_for(domain);
        let key = domain_key(domain);
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("HSET")
            .arg(&key)
            .arg(FIELD_NEXT_FETCH_TIME)
            .arg(next_fetch_time as i64)
            .ignore();
        pipe.cmd("ZADD")
            .arg(KEY_DOMAINS_QUEUE)
            .arg(next_fetch_time)
            .arg(domain)
            .ignore();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn remove_from_queue(&self, domain: &str) -> Result<(), KvError> {
        let mut conn = self.global_conn();
        conn.zrem(KEY_DOMAINS_QUEUE, domain).await?;
        Ok(())
    }

    async fn all_domains(&self) -> Result<Vec<String>, KvError> {
        let mut conn = self.global_conn();
        let domains: Vec<String> = conn.smembers(KEY_DOMAINS_INDEX).await?;
        Ok(domains)
    }

    async fn set_domain_robots(
        &self,
        domain: &str,
        body: &str,
        expires: i64,
    ) -> Result<(), KvError> {
        let mut conn = self.shard_for(domain);
        let key = domain_key(domain);
        let truncated = truncate_body(body);
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("HSET")
            .arg(&key)
            .arg(FIELD_ROBOTS_TXT)
            .arg(truncated)
            .ignore();
        pipe.cmd("HSET")
            .arg(&key)
            .arg(FIELD_ROBOTS_EXPIRES)
            .arg(expires)
            .ignore();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn set_domains_excluded(&self, domains: &[String]) -> Result<(), KvError> {
        let mut conn = self.global_conn();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for domain in domains {
            pipe.cmd("HSET")
                .arg(domain_key(domain))
                .arg(FIELD_IS_EXCLUDED)
                .arg(1)
                .ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn bloom_check_batch(&self, urls: &[String]) -> Result<Vec<bool>, KvError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.global_conn();
        let mut pipe = redis::pipe();
        for url in urls {
            pipe.cmd("BF.EXISTS").arg(KEY_SEEN_BLOOM).arg(url);
        }
        let replies: Vec<i64> = pipe.query_async(&mut conn).await?;
        Ok(replies.into_iter().map(|v| v != 0).collect())
    }

    async fn record_visited(&self, visited_id: &str, fields: VisitedFields) -> Result<(), KvError> {
        let mut conn = self.global_conn();
        let key = visited_key(visited_id);
        let mut pipe = redis::pipe();
        pipe.atomic();

        let mut hset = pipe.cmd("HSET");
        hset.arg(&key)
            .arg(FIELD_URL)
            .arg(&fields.url)
            .arg(FIELD_URL_SHA256)
            .arg(&fields.url_sha256)
            .arg(FIELD_DOMAIN)
            .arg(&fields.domain)
            .arg(FIELD_FETCHED_AT)
            .arg(fields.fetched_at);
        if let Some(status) = fields.status_code {
            hset.arg(FIELD_STATUS_CODE).arg(status);
        }
        if let Some(path) = &fields.content_path {
            hset.arg(FIELD_CONTENT_PATH).arg(path);
        }
        if let Some(ct) = &fields.content_type {
            hset.arg(FIELD_CONTENT_TYPE).arg(ct);
        }
        if let Some(hash) = &fields.content_hash {
            hset.arg(FIELD_CONTENT_HASH).arg(hash);
        }
        if let Some(redirect) = &fields.redirected_to_url {
            hset.arg(FIELD_REDIRECTED_TO_URL).arg(redirect);
        }
        if let Some(err) = &fields.error {
            hset.arg(FIELD_ERROR).arg(err);
        }
        hset.ignore();

        pipe.cmd("ZADD")
            .arg(KEY_VISITED_BY_TIME)
            .arg(fields.fetched_at)
            .arg(visited_id)
            .ignore();

        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn queue_len(&self) -> Result<u64, KvError> {
        let mut conn = self.global_conn();
        let len: u64 = conn.zcard(KEY_DOMAINS_QUEUE).await?;
        Ok(len)
    }
}

fn domain_record_from_pairs(pairs: Vec<(String, String)>) -> DomainRecord {
    let mut record = DomainRecord::default();
    for (field, value) in pairs {
        match field.as_str() {
            FIELD_FRONTIER_OFFSET => record.frontier_offset = value.parse().unwrap_or(0),
            FIELD_FRONTIER_SIZE => record.frontier_size = value.parse().unwrap_or(0),
            FIELD_FILE_PATH => record.file_path = Some(value),
            FIELD_IS_SEEDED => record.is_seeded = value == "1",
            FIELD_IS_EXCLUDED => record.is_excluded = value == "1",
            FIELD_NEXT_FETCH_TIME => record.next_fetch_time = value.parse().ok(),
            FIELD_ROBOTS_TXT => record.robots_txt = Some(value),
            FIELD_ROBOTS_EXPIRES => record.robots_expires = value.parse().ok(),
            _ => {}
        }
    }
    record
}
