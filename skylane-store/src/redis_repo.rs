use redis::{AsyncCommands, RedisResult};
use tracing::info;

/// Single-airport cache entries live under `airport:<CODE>`.
pub const AIRPORT_KEY_PREFIX: &str = "airport:";
/// The full listing is cached as one blob with a shorter TTL.
pub const AIRPORT_LIST_KEY: &str = "airport:all";

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    fn airport_key(code: &str) -> String {
        format!("{}{}", AIRPORT_KEY_PREFIX, code)
    }

    pub async fn get_airport(&self, code: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::airport_key(code)).await?;
        Ok(payload)
    }

    pub async fn set_airport(
        &self,
        code: &str,
        payload: &str,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::airport_key(code), payload, ttl_seconds)
            .await?;
        Ok(())
    }

    /// Batch lookup; the result keeps positional correspondence with `codes`
    /// and a missing entry comes back as None.
    pub async fn get_airports(&self, codes: &[String]) -> RedisResult<Vec<Option<String>>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = codes.iter().map(|c| Self::airport_key(c)).collect();
        let payloads: Vec<Option<String>> = conn.mget(keys).await?;
        Ok(payloads)
    }

    /// Batch write used by warm-up flows.
    pub async fn set_airports(
        &self,
        entries: &[(String, String)],
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut pipe = redis::pipe();
        for (code, payload) in entries {
            pipe.set_ex(Self::airport_key(code), payload, ttl_seconds)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        info!("Warmed {} airport cache entries", entries.len());
        Ok(())
    }

    pub async fn get_airport_list(&self) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(AIRPORT_LIST_KEY).await?;
        Ok(payload)
    }

    pub async fn set_airport_list(&self, payload: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(AIRPORT_LIST_KEY, payload, ttl_seconds)
            .await?;
        Ok(())
    }

    /// Drops the airport's entry and the listing blob after a write.
    pub async fn invalidate_airport(&self, code: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::pipe()
            .del(Self::airport_key(code))
            .ignore()
            .del(AIRPORT_LIST_KEY)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Full prefix sweep for the clear-all admin operation. Returns how many
    /// keys were removed.
    pub async fn clear_airport_cache(&self) -> RedisResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(format!("{}*", AIRPORT_KEY_PREFIX))
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = conn.del(keys).await?;
        info!("Cleared {} airport cache entries", removed);
        Ok(removed)
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
