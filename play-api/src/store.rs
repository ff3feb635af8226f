use sqlx::{Pool, Postgres};

use common::{
    models::{Coin, Player},
    utils::{utc_day_start, ScoreStatus},
};

/// Games are looked up by numeric id or by on-chain coin address,
/// interchangeably.
#[derive(Debug, Clone)]
pub enum CoinKey {
    Id(i64),
    Address(String),
}

impl CoinKey {
    pub fn from_id_or_address(raw: &str) -> CoinKey {
        match raw.trim().parse::<i64>() {
            Ok(id) => CoinKey::Id(id),
            Err(_) => CoinKey::Address(raw.trim().to_string()),
        }
    }
}

impl std::fmt::Display for CoinKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoinKey::Id(id) => write!(f, "{}", id),
            CoinKey::Address(addr) => write!(f, "{}", addr),
        }
    }
}

/// Relational side of the play/reward engines. Production impl is Postgres;
/// tests swap in a mock to inject faults step by step.
pub trait AwardStore {
    async fn player_exists(&self, fid: i64) -> anyhow::Result<bool>;
    async fn find_coin(&self, key: &CoinKey) -> anyhow::Result<Option<Coin>>;
    /// Authoritative play count for (fid, coin) in the current UTC day,
    /// derived from the score ledger.
    async fn count_daily_plays(&self, fid: i64, coin_id: i64) -> anyhow::Result<i64>;
    async fn has_played(&self, fid: i64, game_id: i64) -> anyhow::Result<bool>;
    /// The single critical write: atomic points increment.
    async fn increment_points(&self, fid: i64, amount: i64) -> anyhow::Result<()>;
    async fn insert_score(&self, fid: i64, coin_id: i64, score: i64) -> anyhow::Result<()>;
    /// True if a new first-play marker was written; duplicate is a no-op.
    async fn insert_play_record(
        &self,
        fid: i64,
        game_id: i64,
        coin_address: &str,
    ) -> anyhow::Result<bool>;
    async fn fetch_or_create_player(
        &self,
        fid: i64,
        wallet_address: Option<&str>,
    ) -> anyhow::Result<Player>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

impl AwardStore for PgStore {
    async fn player_exists(&self, fid: i64) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM players WHERE fid = $1)")
                .bind(fid)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_coin(&self, key: &CoinKey) -> anyhow::Result<Option<Coin>> {
        let coin: Option<Coin> = match key {
            CoinKey::Id(id) => {
                sqlx::query_as("SELECT * FROM coins WHERE id = $1")
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            CoinKey::Address(addr) => {
                sqlx::query_as("SELECT * FROM coins WHERE LOWER(coin_address) = LOWER($1)")
                    .bind(addr)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(coin)
    }

    async fn count_daily_plays(&self, fid: i64, coin_id: i64) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scores WHERE fid = $1 AND coin_id = $2 AND created_at >= $3",
        )
        .bind(fid)
        .bind(coin_id)
        .bind(utc_day_start())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn has_played(&self, fid: i64, game_id: i64) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM game_plays WHERE fid = $1 AND game_id = $2)",
        )
        .bind(fid)
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn increment_points(&self, fid: i64, amount: i64) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE players SET points = points + $1 WHERE fid = $2")
            .bind(amount)
            .bind(fid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No player row for fid {}", fid);
        }
        Ok(())
    }

    async fn insert_score(&self, fid: i64, coin_id: i64, score: i64) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO scores (fid, coin_id, score, status) VALUES ($1, $2, $3, $4)")
            .bind(fid)
            .bind(coin_id)
            .bind(score)
            .bind(ScoreStatus::Pending.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_play_record(
        &self,
        fid: i64,
        game_id: i64,
        coin_address: &str,
    ) -> anyhow::Result<bool> {
        // UNIQUE (fid, game_id); a lost race just becomes a no-op here.
        let result = sqlx::query(
            "INSERT INTO game_plays (fid, game_id, coin_address) VALUES ($1, $2, $3)
             ON CONFLICT (fid, game_id) DO NOTHING",
        )
        .bind(fid)
        .bind(game_id)
        .bind(coin_address)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_or_create_player(
        &self,
        fid: i64,
        wallet_address: Option<&str>,
    ) -> anyhow::Result<Player> {
        let player: Player = sqlx::query_as(
            "INSERT INTO players (fid, wallet_address) VALUES ($1, $2)
             ON CONFLICT (fid) DO UPDATE
             SET wallet_address = COALESCE(EXCLUDED.wallet_address, players.wallet_address)
             RETURNING *",
        )
        .bind(fid)
        .bind(wallet_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_key_parses_numeric_id() {
        assert!(matches!(
            CoinKey::from_id_or_address("42"),
            CoinKey::Id(42)
        ));
        assert!(matches!(
            CoinKey::from_id_or_address(" 7 "),
            CoinKey::Id(7)
        ));
    }

    #[test]
    fn coin_key_falls_back_to_address() {
        match CoinKey::from_id_or_address("0xdeadbeef00000000000000000000000000000000") {
            CoinKey::Address(addr) => {
                assert_eq!(addr, "0xdeadbeef00000000000000000000000000000000")
            }
            CoinKey::Id(_) => panic!("expected address key"),
        }
    }
}
