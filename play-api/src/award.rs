use tracing::warn;

use common::utils::{DAILY_POINTS_CAP, next_utc_midnight};

use crate::error::ApiError;
use crate::quota::QuotaStore;
use crate::store::{AwardStore, CoinKey};

/// Outcome of a write that is allowed to fail without failing the request.
/// Kept separate from the critical-path `Result` so tests can assert on each
/// side-effect independently.
#[derive(Debug)]
pub enum BestEffort<T> {
    Done(T),
    Failed,
}

impl<T> BestEffort<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, BestEffort::Done(_))
    }

    fn record(result: anyhow::Result<T>, what: &str, fid: i64) -> Self {
        match result {
            Ok(value) => BestEffort::Done(value),
            Err(e) => {
                warn!(fid = %fid, "Best-effort write failed ({}): {}", what, e);
                BestEffort::Failed
            }
        }
    }
}

/// Successful award. Best-effort side effects ride along so the handler can
/// report `playRecorded` and a possibly-estimated play count.
#[derive(Debug)]
pub struct AwardGranted {
    pub score: i64,
    pub daily_points_remaining: i64,
    pub plays_remaining: i64,
    pub max_daily_plays: i64,
    pub current_daily_plays: i64,
    pub play_counter: BestEffort<i64>,
    pub score_logged: BestEffort<()>,
    pub first_play_marker: BestEffort<bool>,
}

impl AwardGranted {
    pub fn play_recorded(&self) -> bool {
        self.play_counter.is_done() && self.score_logged.is_done()
    }
}

/// Score must be a finite, non-negative number. Fractions are floored into
/// ledger points.
pub fn validate_score(raw: f64) -> Result<i64, ApiError> {
    if !raw.is_finite() {
        return Err(ApiError::InvalidInput("Score must be a finite number".into()));
    }
    if raw < 0.0 {
        return Err(ApiError::InvalidInput("Score must not be negative".into()));
    }
    Ok(raw.floor() as i64)
}

/// The award guard chain. Identity checks (fid verification, reputation)
/// happen in the handler before this runs; everything from the local player
/// lookup to the best-effort writes lives here.
///
/// Ordering is load-bearing: the points increment is the only fatal write and
/// must land before any of the best-effort writes. A crash after it leaves
/// points granted with the play uncounted, which is the accepted trade-off.
pub async fn grant_award<S: AwardStore, Q: QuotaStore>(
    store: &S,
    quota: &Q,
    fid: i64,
    coin_key: &CoinKey,
    score: i64,
) -> Result<AwardGranted, ApiError> {
    if !store
        .player_exists(fid)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to look up player: {}", e)))?
    {
        return Err(ApiError::NotFound("Player not found".into()));
    }

    // Generic rate limit, fail-open: an unreachable quota store must not take
    // the whole award path down with it.
    match quota.record_award_call(fid).await {
        Ok(decision) if !decision.allowed => {
            return Err(ApiError::RateLimited {
                limit: decision.limit,
                remaining: decision.remaining,
                reset_secs: decision.reset_secs,
            });
        }
        Ok(_) => {}
        Err(e) => {
            warn!(fid = %fid, "Rate limit check unavailable, allowing request: {}", e);
        }
    }

    let coin = store
        .find_coin(coin_key)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to look up coin: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Coin not found".into()))?;

    if score > coin.max_points() {
        return Err(ApiError::InvalidInput(format!(
            "Score exceeds maximum of {}",
            coin.max_points()
        )));
    }

    // Authoritative daily-limit recount, before any mutation. Reservations
    // are advisory; this is the enforcement point.
    let current_daily_plays = store
        .count_daily_plays(fid, coin.id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to count plays: {}", e)))?;
    let max_daily_plays = coin.max_plays();
    if current_daily_plays >= max_daily_plays {
        return Err(ApiError::DailyLimitReached {
            max_daily_plays,
            current_daily_plays,
            reset_at: next_utc_midnight(),
        });
    }

    // Daily points cap, fail-open on store errors like the rate limit.
    let points_today = match quota.daily_points(fid).await {
        Ok(points) => points,
        Err(e) => {
            warn!(fid = %fid, "Daily points lookup unavailable, assuming 0: {}", e);
            0
        }
    };
    if points_today + score > DAILY_POINTS_CAP {
        return Err(ApiError::DailyCapExceeded {
            cap: DAILY_POINTS_CAP,
            remaining: (DAILY_POINTS_CAP - points_today).max(0),
            reset_at: next_utc_midnight(),
        });
    }

    // Critical write. Failure here is the only 500 in the chain and nothing
    // below may run before it succeeds.
    store
        .increment_points(fid, score)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to award points: {}", e)))?;

    let play_counter = BestEffort::record(
        quota.incr_daily_plays(fid, coin.id).await,
        "daily play counter",
        fid,
    );
    if let Err(e) = quota.add_daily_points(fid, score).await {
        warn!(fid = %fid, "Failed to record daily points: {}", e);
    }

    let score_logged = BestEffort::record(
        store.insert_score(fid, coin.id, score).await,
        "score ledger row",
        fid,
    );

    let first_play_marker = match store.has_played(fid, coin.id).await {
        Ok(true) => BestEffort::Done(false),
        Ok(false) => BestEffort::record(
            store.insert_play_record(fid, coin.id, &coin.coin_address).await,
            "first-play marker",
            fid,
        ),
        Err(e) => {
            warn!(fid = %fid, "Failed to check first-play marker: {}", e);
            BestEffort::Failed
        }
    };

    // The client never sees a crash-causing inconsistency here: if the
    // counter increment failed, report an estimate instead.
    let current_daily_plays = match &play_counter {
        BestEffort::Done(count) => *count,
        BestEffort::Failed => current_daily_plays + 1,
    };

    Ok(AwardGranted {
        score,
        daily_points_remaining: (DAILY_POINTS_CAP - points_today - score).max(0),
        plays_remaining: (max_daily_plays - current_daily_plays).max(0),
        max_daily_plays,
        current_daily_plays,
        play_counter,
        score_logged,
        first_play_marker,
    })
}
