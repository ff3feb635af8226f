use std::env;

use dotenv::dotenv;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::models::LeaderboardEntry;

pub async fn establish_connection() -> Pool<Postgres> {
    dotenv().ok();

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    info!("Connecting to Postgres");

    PgPoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await
        .expect("Failed to create pool")
}

pub async fn get_leaderboard(
    pool: &Pool<Postgres>,
    coin_id: i64,
    limit: i64,
) -> anyhow::Result<Vec<LeaderboardEntry>> {
    let leaders: Vec<LeaderboardEntry> = sqlx::query_as(
        "SELECT fid, SUM(score)::BIGINT AS total_score,
                RANK() OVER (ORDER BY SUM(score) DESC) AS rank
         FROM scores
         WHERE coin_id = $1
         GROUP BY fid
         ORDER BY total_score DESC
         LIMIT $2",
    )
    .bind(coin_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(leaders)
}
