use chrono;
use serde::Deserialize;
use serde::Serialize;

/// Per-game configuration row. One coin is minted per generated game; the
/// play/reward limits ride along with it. NULL columns fall back to the
/// defaults in `utils`.
#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
pub struct Coin {
    pub id: i64,
    pub coin_address: String,
    pub name: String,
    pub max_plays: Option<i32>,
    pub max_points: Option<i32>,
    pub token_multiplier: Option<i32>,
    pub premium_threshold: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Coin {
    pub fn max_plays(&self) -> i64 {
        self.max_plays.map(i64::from).unwrap_or(crate::utils::DEFAULT_MAX_PLAYS)
    }

    pub fn max_points(&self) -> i64 {
        self.max_points.map(i64::from).unwrap_or(crate::utils::DEFAULT_MAX_POINTS)
    }

    pub fn token_multiplier(&self) -> i64 {
        self.token_multiplier.map(i64::from).unwrap_or(1)
    }
}

/// `points` only ever moves up, via a single atomic increment.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub fid: i64,
    pub wallet_address: Option<String>,
    pub points: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Append-only award ledger. Rows start `pending` and are flipped to
/// `complete` by the distributor once tokens land on-chain.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Score {
    pub id: i64,
    pub fid: i64,
    pub coin_id: i64,
    pub score: i64,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// First-play marker per (fid, game). UNIQUE (fid, game_id) in the schema,
/// inserts use ON CONFLICT DO NOTHING.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct GamePlay {
    pub id: i64,
    pub fid: i64,
    pub game_id: i64,
    pub coin_address: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub fid: i64,
    pub total_score: i64,
    pub rank: i64,
}
