use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use common::{db, utils::REPUTATION_FLOOR};
use erc20::Erc20Client;

use crate::auth::AuthenticatedFid;
use crate::award::{grant_award, validate_score};
use crate::config::Config;
use crate::eligibility::{balance_gate, gate, Gate};
use crate::error::ApiError;
use crate::identity::IdentityClient;
use crate::metrics;
use crate::quota::RedisQuota;
use crate::reservation;
use crate::store::{AwardStore, CoinKey, PgStore};

pub struct AppState {
    pub store: PgStore,
    pub quota: RedisQuota,
    pub identity: IdentityClient,
    pub erc20: Erc20Client,
    pub config: Config,
}

/// Game reference as sent by clients: numeric id or coin address,
/// interchangeable.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CoinIdParam {
    Id(i64),
    Raw(String),
}

impl CoinIdParam {
    fn to_key(&self) -> CoinKey {
        match self {
            CoinIdParam::Id(id) => CoinKey::Id(*id),
            CoinIdParam::Raw(raw) => CoinKey::from_id_or_address(raw),
        }
    }
}

fn authenticated_fid(req: &HttpRequest) -> Result<i64, ApiError> {
    req.extensions()
        .get::<AuthenticatedFid>()
        .map(|fid| fid.0)
        .ok_or_else(|| ApiError::Unauthorized("Missing x-user-fid header".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPlayStatusRequest {
    fid: i64,
    coin_id: i64,
    coin_address: Option<String>,
    wallet_address: Option<String>,
}

#[actix_web::post("/api/check-play-status")]
pub async fn check_play_status(
    req: web::Json<CheckPlayStatusRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    if req.fid <= 0 {
        return Err(ApiError::InvalidInput("fid must be a positive integer".into()));
    }

    let coin = app_state
        .store
        .find_coin(&CoinKey::Id(req.coin_id))
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to look up coin: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Coin not found".into()))?;

    let current_daily_plays = app_state
        .store
        .count_daily_plays(req.fid, coin.id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to count plays: {}", e)))?;
    let has_played = app_state
        .store
        .has_played(req.fid, coin.id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to check play history: {}", e)))?;

    let verdict = match gate(
        coin.max_plays(),
        current_daily_plays,
        has_played,
        req.wallet_address.as_deref(),
    ) {
        Gate::Settled(verdict) => verdict,
        Gate::NeedsBalance { wallet } => {
            let token = req.coin_address.as_deref().unwrap_or(&coin.coin_address);
            let threshold = coin
                .premium_threshold
                .and_then(|t| u64::try_from(t).ok())
                .unwrap_or(app_state.config.premium_threshold);
            let balance = app_state.erc20.balance_and_decimals(token, &wallet).await;
            balance_gate(coin.max_plays(), current_daily_plays, threshold, balance)
        }
    };

    info!(
        fid = %req.fid,
        coin_id = %coin.id,
        can_play = %verdict.can_play,
        reason = %verdict.reason.as_str(),
        "Play status checked"
    );
    metrics::record_play_check(verdict.reason.as_str());

    Ok(HttpResponse::Ok().json(verdict))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservePlayRequest {
    coin_id: CoinIdParam,
}

#[actix_web::post("/api/reserve-play")]
pub async fn reserve_play(
    http_req: HttpRequest,
    req: web::Json<ReservePlayRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let fid = authenticated_fid(&http_req)?;
    let key = req.coin_id.to_key();

    let grant = reservation::reserve(&app_state.store, &app_state.quota, fid, &key).await?;
    metrics::record_reservation("reserved");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "reservationId": grant.reservation_id,
        "limit": grant.limit,
        "remaining": grant.remaining,
        "currentPlays": grant.current_plays,
        "resetAt": grant.reset_at,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePlayRequest {
    coin_id: CoinIdParam,
    reservation_id: String,
}

#[actix_web::post("/api/release-play")]
pub async fn release_play(
    http_req: HttpRequest,
    req: web::Json<ReleasePlayRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let fid = authenticated_fid(&http_req)?;
    info!(fid = %fid, coin_id = ?req.coin_id, "Releasing play reservation");

    let released = reservation::release(&app_state.quota, fid, &req.reservation_id).await;
    metrics::record_reservation(if released { "released" } else { "release_miss" });

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "released": released,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardRequest {
    coin_id: CoinIdParam,
    score: f64,
}

#[actix_web::post("/api/award")]
pub async fn award(
    http_req: HttpRequest,
    req: web::Json<AwardRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let fid = authenticated_fid(&http_req)?;
    let score = validate_score(req.score)?;
    let key = req.coin_id.to_key();

    // Identity checks fail closed: an unreachable identity graph denies.
    let user = app_state
        .identity
        .fetch_user(fid)
        .await
        .map_err(|e| ApiError::Unauthorized(format!("Could not verify fid: {}", e)))?
        .ok_or_else(|| ApiError::Unauthorized("Unknown fid".into()))?;

    let reputation = user.score.unwrap_or(0.0);
    if reputation < REPUTATION_FLOOR {
        metrics::record_award("rejected_reputation");
        return Err(ApiError::ReputationTooLow { score: reputation });
    }

    let granted = match grant_award(&app_state.store, &app_state.quota, fid, &key, score).await {
        Ok(granted) => granted,
        Err(e) => {
            metrics::record_award("rejected");
            return Err(e);
        }
    };

    info!(
        fid = %fid,
        coin_id = %key,
        score = %granted.score,
        plays_remaining = %granted.plays_remaining,
        play_recorded = %granted.play_recorded(),
        "Awarded points"
    );
    metrics::record_award("granted");
    metrics::record_points(granted.score);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "score": granted.score,
        "dailyPointsRemaining": granted.daily_points_remaining,
        "playsRemaining": granted.plays_remaining,
        "maxDailyPlays": granted.max_daily_plays,
        "currentDailyPlays": granted.current_daily_plays,
        "playRecorded": granted.play_recorded(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    fid: i64,
    wallet_address: Option<String>,
}

#[actix_web::post("/api/players")]
pub async fn fetch_or_create_player(
    req: web::Json<PlayerRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if req.fid <= 0 {
        return Err(ApiError::InvalidInput("fid must be a positive integer".into()));
    }

    let player = app_state
        .store
        .fetch_or_create_player(req.fid, req.wallet_address.as_deref())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to upsert player: {}", e)))?;

    Ok(HttpResponse::Ok().json(json!({
        "fid": player.fid,
        "walletAddress": player.wallet_address,
        "points": player.points,
        "createdAt": player.created_at,
    })))
}

#[actix_web::get("/api/leaderboard/{coin_id}")]
pub async fn leaderboard(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let coin_id = path.into_inner();
    let leaders = db::get_leaderboard(app_state.store.pool(), coin_id, 100)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to fetch leaderboard: {}", e)))?;

    Ok(HttpResponse::Ok().json(leaders))
}

#[actix_web::get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[actix_web::get("/metrics")]
pub async fn metrics_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::render())
}
