use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

/// Full failure taxonomy of the play/reward surface. Every variant maps to
/// exactly one HTTP status; quota variants carry the metadata clients need
/// for backoff/countdown UI.
#[derive(Debug)]
pub enum ApiError {
    /// 400 — malformed or out-of-range input. Never retried.
    InvalidInput(String),
    /// 401 — missing/garbage fid, or identity could not be verified.
    Unauthorized(String),
    /// 403 — Neynar user score below the spam floor.
    ReputationTooLow { score: f64 },
    /// 404 — unknown player or coin.
    NotFound(String),
    /// 429 — generic rolling-window rate limit.
    RateLimited {
        limit: i64,
        remaining: i64,
        reset_secs: i64,
    },
    /// 429 — daily play limit for this game is exhausted.
    DailyLimitReached {
        max_daily_plays: i64,
        current_daily_plays: i64,
        reset_at: chrono::DateTime<chrono::Utc>,
    },
    /// 429 — the award would blow the daily points cap.
    DailyCapExceeded {
        cap: i64,
        remaining: i64,
        reset_at: chrono::DateTime<chrono::Utc>,
    },
    /// 500 — the critical points increment failed. The only fatal write.
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidInput(msg) => write!(f, "{}", msg),
            ApiError::Unauthorized(msg) => write!(f, "{}", msg),
            ApiError::ReputationTooLow { score } => {
                write!(f, "account reputation too low: {}", score)
            }
            ApiError::NotFound(msg) => write!(f, "{}", msg),
            ApiError::RateLimited { .. } => write!(f, "rate limit exceeded"),
            ApiError::DailyLimitReached { .. } => write!(f, "daily play limit reached"),
            ApiError::DailyCapExceeded { .. } => write!(f, "daily points cap exceeded"),
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ReputationTooLow { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. }
            | ApiError::DailyLimitReached { .. }
            | ApiError::DailyCapExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::RateLimited {
                limit,
                remaining,
                reset_secs,
            } => HttpResponse::TooManyRequests()
                .insert_header(("X-RateLimit-Limit", limit.to_string()))
                .insert_header(("X-RateLimit-Remaining", remaining.to_string()))
                .insert_header(("X-RateLimit-Reset", reset_secs.to_string()))
                .json(json!({
                    "error": "rate_limit_exceeded",
                    "limit": limit,
                    "remaining": remaining,
                    "retryAfter": reset_secs,
                })),
            ApiError::DailyLimitReached {
                max_daily_plays,
                current_daily_plays,
                reset_at,
            } => HttpResponse::TooManyRequests().json(json!({
                "error": "daily_limit_reached",
                "maxDailyPlays": max_daily_plays,
                "currentDailyPlays": current_daily_plays,
                "resetAt": reset_at,
            })),
            ApiError::DailyCapExceeded {
                cap,
                remaining,
                reset_at,
            } => HttpResponse::TooManyRequests().json(json!({
                "error": "daily_points_cap_exceeded",
                "cap": cap,
                "remaining": remaining,
                "resetAt": reset_at,
            })),
            ApiError::ReputationTooLow { score } => HttpResponse::Forbidden().json(json!({
                "error": "reputation_too_low",
                "score": score,
            })),
            other => HttpResponse::build(other.status_code()).json(json!({
                "error": other.to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            ApiError::InvalidInput("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("no fid".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::ReputationTooLow { score: 0.1 }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("coin".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::RateLimited {
                limit: 50,
                remaining: 0,
                reset_secs: 10
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("db down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_response_carries_backoff_headers() {
        let err = ApiError::RateLimited {
            limit: 50,
            remaining: 0,
            reset_secs: 1200,
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = resp.headers();
        assert_eq!(headers.get("X-RateLimit-Limit").unwrap(), "50");
        assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "0");
        assert_eq!(headers.get("X-RateLimit-Reset").unwrap(), "1200");
    }
}
