use std::{collections::HashMap, env, time::Duration};

use sqlx::{Pool, Postgres};
use tokio::time::sleep;
use tracing::{info, warn};

use common::{db::establish_connection, utils::ScoreStatus};
use erc20::{points_to_token_units, Erc20Client};

const POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_BATCH_SIZE: i64 = 25;

/// Pending ledger row joined with the game's coin and the player's wallet.
#[derive(Debug, sqlx::FromRow)]
struct PendingPayout {
    id: i64,
    fid: i64,
    score: i64,
    coin_address: String,
    token_multiplier: Option<i32>,
    wallet_address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();
    info!("Starting the token distribution service");

    let rpc_url = env::var("RPC_URL").expect("RPC_URL must be set");
    let private_key =
        env::var("DISTRIBUTOR_PRIVATE_KEY").expect("DISTRIBUTOR_PRIVATE_KEY must be set");
    let batch_size = env::var("DISTRIBUTOR_BATCH_SIZE")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(DEFAULT_BATCH_SIZE);

    let erc20 = Erc20Client::new(&rpc_url);
    let pool = establish_connection().await;

    loop {
        if let Err(e) = distribute_batch(&pool, &erc20, &private_key, batch_size).await {
            warn!("Distribution pass failed: {}", e);
        }
        sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
    }
}

async fn distribute_batch(
    pool: &Pool<Postgres>,
    erc20: &Erc20Client,
    private_key: &str,
    batch_size: i64,
) -> anyhow::Result<()> {
    let pending: Vec<PendingPayout> = sqlx::query_as(
        "SELECT s.id, s.fid, s.score, c.coin_address, c.token_multiplier, p.wallet_address
         FROM scores s
         JOIN coins c ON c.id = s.coin_id
         JOIN players p ON p.fid = s.fid
         WHERE s.status = $1
         ORDER BY s.created_at
         LIMIT $2",
    )
    .bind(ScoreStatus::Pending.to_string())
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    if pending.is_empty() {
        return Ok(());
    }
    info!("Found {} pending payouts", pending.len());

    // decimals() is immutable per token; one read per coin per pass.
    let mut decimals_by_coin: HashMap<String, u8> = HashMap::new();

    for payout in pending {
        let wallet = match payout.wallet_address.as_deref() {
            Some(wallet) if !wallet.is_empty() => wallet,
            _ => {
                warn!(score_id = %payout.id, fid = %payout.fid, "Skipping payout, player has no wallet");
                continue;
            }
        };

        let decimals = match decimals_by_coin.get(&payout.coin_address) {
            Some(decimals) => *decimals,
            None => {
                let decimals = erc20.decimals(&payout.coin_address).await?;
                decimals_by_coin.insert(payout.coin_address.clone(), decimals);
                decimals
            }
        };

        let multiplier = payout.token_multiplier.map(i64::from).unwrap_or(1);
        let amount = points_to_token_units(payout.score, multiplier, decimals);

        // A failed transfer leaves the row pending for the next pass.
        let tx_hash = match erc20
            .transfer(private_key, &payout.coin_address, wallet, amount)
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                warn!(score_id = %payout.id, fid = %payout.fid, "Token transfer failed: {}", e);
                continue;
            }
        };

        sqlx::query("UPDATE scores SET status = $1 WHERE id = $2")
            .bind(ScoreStatus::Complete.to_string())
            .bind(payout.id)
            .execute(pool)
            .await?;

        info!(
            score_id = %payout.id,
            fid = %payout.fid,
            amount = %amount,
            tx_hash = %tx_hash,
            "Distributed tokens for pending score"
        );
    }

    Ok(())
}
