use redis::AsyncCommands;

use common::utils::{
    secs_until_utc_midnight, utc_day_stamp, AWARD_RATE_LIMIT, AWARD_RATE_WINDOW_SECS,
};

const RESERVATION_TTL_SECS: u64 = 120;

#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: i64,
    pub remaining: i64,
    pub reset_secs: i64,
}

/// Key-value counters with TTL semantics: the rolling award rate limit, the
/// daily points/plays counters, and advisory reservation markers. Callers
/// decide fail-open vs fail-closed; this layer just reports errors.
pub trait QuotaStore {
    async fn record_award_call(&self, fid: i64) -> anyhow::Result<RateDecision>;
    async fn daily_points(&self, fid: i64) -> anyhow::Result<i64>;
    async fn add_daily_points(&self, fid: i64, amount: i64) -> anyhow::Result<()>;
    /// Returns the new count for the current UTC day.
    async fn incr_daily_plays(&self, fid: i64, coin_id: i64) -> anyhow::Result<i64>;
    async fn put_reservation(&self, id: &str, fid: i64, coin_id: i64) -> anyhow::Result<()>;
    /// True if the marker existed and was removed.
    async fn take_reservation(&self, id: &str) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct RedisQuota {
    client: redis::Client,
}

impl RedisQuota {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

impl QuotaStore for RedisQuota {
    async fn record_award_call(&self, fid: i64) -> anyhow::Result<RateDecision> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("rate:award:{}", fid);

        // One atomic round trip: EXPIRE NX arms the window only on the first
        // hit, so a crash mid-call cannot leave the key without a TTL.
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.incr(&key, 1);
        pipe.cmd("EXPIRE")
            .arg(&key)
            .arg(AWARD_RATE_WINDOW_SECS)
            .arg("NX");
        pipe.ttl(&key);
        let (count, _, ttl): (i64, i64, i64) = pipe.query_async(&mut conn).await?;
        let reset_secs = if ttl > 0 { ttl } else { AWARD_RATE_WINDOW_SECS };

        Ok(RateDecision {
            allowed: count <= AWARD_RATE_LIMIT,
            limit: AWARD_RATE_LIMIT,
            remaining: (AWARD_RATE_LIMIT - count).max(0),
            reset_secs,
        })
    }

    async fn daily_points(&self, fid: i64) -> anyhow::Result<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("daily_points:{}:{}", fid, utc_day_stamp());
        let points: Option<i64> = conn.get(&key).await?;
        Ok(points.unwrap_or(0))
    }

    async fn add_daily_points(&self, fid: i64, amount: i64) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("daily_points:{}:{}", fid, utc_day_stamp());

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.incr(&key, amount);
        pipe.expire(&key, secs_until_utc_midnight());
        let _: (i64, bool) = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn incr_daily_plays(&self, fid: i64, coin_id: i64) -> anyhow::Result<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("daily_plays:{}:{}:{}", fid, coin_id, utc_day_stamp());

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.incr(&key, 1);
        pipe.expire(&key, secs_until_utc_midnight());
        let (count, _): (i64, bool) = pipe.query_async(&mut conn).await?;
        Ok(count)
    }

    async fn put_reservation(&self, id: &str, fid: i64, coin_id: i64) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("reservation:{}", id);
        let _: () = conn
            .set_ex(&key, format!("{}:{}", fid, coin_id), RESERVATION_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn take_reservation(&self, id: &str) -> anyhow::Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("reservation:{}", id);
        let removed: i64 = conn.del(&key).await?;
        Ok(removed > 0)
    }
}
