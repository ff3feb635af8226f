use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use common::utils::next_utc_midnight;

use crate::error::ApiError;
use crate::quota::QuotaStore;
use crate::store::{AwardStore, CoinKey};

/// Advisory play-slot reservation. The id is a correlation token for the
/// client, not a held slot: the authoritative daily-limit enforcement is the
/// recount inside the award engine.
#[derive(Debug)]
pub struct ReservationGrant {
    pub reservation_id: String,
    pub limit: i64,
    pub remaining: i64,
    pub current_plays: i64,
    pub reset_at: chrono::DateTime<chrono::Utc>,
}

pub fn mint_reservation_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("db-{}-{}", Utc::now().timestamp_millis(), &random[..8])
}

/// Re-validates player existence and the daily limit (defense in depth,
/// duplicated from the eligibility engine) before minting an id.
pub async fn reserve<S: AwardStore, Q: QuotaStore>(
    store: &S,
    quota: &Q,
    fid: i64,
    coin_key: &CoinKey,
) -> Result<ReservationGrant, ApiError> {
    if !store
        .player_exists(fid)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to look up player: {}", e)))?
    {
        return Err(ApiError::NotFound("Player not found".into()));
    }

    let coin = store
        .find_coin(coin_key)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to look up coin: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Coin not found".into()))?;

    let current_plays = store
        .count_daily_plays(fid, coin.id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to count plays: {}", e)))?;
    let limit = coin.max_plays();
    if current_plays >= limit {
        return Err(ApiError::DailyLimitReached {
            max_daily_plays: limit,
            current_daily_plays: current_plays,
            reset_at: next_utc_midnight(),
        });
    }

    let reservation_id = mint_reservation_id();
    // Advisory marker only; losing it costs nothing but a warning later.
    if let Err(e) = quota.put_reservation(&reservation_id, fid, coin.id).await {
        warn!(fid = %fid, reservation_id = %reservation_id, "Failed to store reservation marker: {}", e);
    }

    Ok(ReservationGrant {
        reservation_id,
        limit,
        remaining: (limit - current_plays).max(0),
        current_plays,
        reset_at: next_utc_midnight(),
    })
}

/// No-op-safe: an unknown or expired reservation is a warning, never an
/// error, and the call always reports success.
pub async fn release<Q: QuotaStore>(quota: &Q, fid: i64, reservation_id: &str) -> bool {
    match quota.take_reservation(reservation_id).await {
        Ok(true) => true,
        Ok(false) => {
            warn!(fid = %fid, reservation_id = %reservation_id, "Reservation not found or expired");
            false
        }
        Err(e) => {
            warn!(fid = %fid, reservation_id = %reservation_id, "Failed to release reservation: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::RateDecision;
    use chrono::Utc;
    use common::models::Coin;
    use std::cell::RefCell;

    struct MockStore {
        player: bool,
        daily_plays: i64,
    }

    impl AwardStore for MockStore {
        async fn player_exists(&self, _fid: i64) -> anyhow::Result<bool> {
            Ok(self.player)
        }

        async fn find_coin(&self, _key: &CoinKey) -> anyhow::Result<Option<Coin>> {
            Ok(Some(Coin {
                id: 7,
                coin_address: "0x00000000000000000000000000000000000000aa".into(),
                name: "flappy".into(),
                max_plays: Some(3),
                max_points: None,
                token_multiplier: None,
                premium_threshold: None,
                created_at: Utc::now(),
            }))
        }

        async fn count_daily_plays(&self, _fid: i64, _coin_id: i64) -> anyhow::Result<i64> {
            Ok(self.daily_plays)
        }

        async fn has_played(&self, _fid: i64, _game_id: i64) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn increment_points(&self, _fid: i64, _amount: i64) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn insert_score(&self, _fid: i64, _coin_id: i64, _score: i64) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn insert_play_record(
            &self,
            _fid: i64,
            _game_id: i64,
            _coin_address: &str,
        ) -> anyhow::Result<bool> {
            unreachable!()
        }

        async fn fetch_or_create_player(
            &self,
            _fid: i64,
            _wallet_address: Option<&str>,
        ) -> anyhow::Result<common::models::Player> {
            unreachable!()
        }
    }

    struct MockQuota {
        reservations: RefCell<Vec<String>>,
        fail_put: bool,
    }

    impl QuotaStore for MockQuota {
        async fn record_award_call(&self, _fid: i64) -> anyhow::Result<RateDecision> {
            unreachable!()
        }

        async fn daily_points(&self, _fid: i64) -> anyhow::Result<i64> {
            unreachable!()
        }

        async fn add_daily_points(&self, _fid: i64, _amount: i64) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn incr_daily_plays(&self, _fid: i64, _coin_id: i64) -> anyhow::Result<i64> {
            unreachable!()
        }

        async fn put_reservation(&self, id: &str, _fid: i64, _coin_id: i64) -> anyhow::Result<()> {
            if self.fail_put {
                anyhow::bail!("redis down");
            }
            self.reservations.borrow_mut().push(id.to_string());
            Ok(())
        }

        async fn take_reservation(&self, id: &str) -> anyhow::Result<bool> {
            let mut reservations = self.reservations.borrow_mut();
            match reservations.iter().position(|r| r == id) {
                Some(pos) => {
                    reservations.remove(pos);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn quota() -> MockQuota {
        MockQuota {
            reservations: RefCell::new(Vec::new()),
            fail_put: false,
        }
    }

    #[test]
    fn reservation_id_has_expected_shape() {
        let id = mint_reservation_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "db");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[tokio::test]
    async fn reserve_then_release_round_trips() {
        let store = MockStore {
            player: true,
            daily_plays: 1,
        };
        let quota = quota();

        let grant = reserve(&store, &quota, 1, &CoinKey::Id(7)).await.unwrap();
        assert_eq!(grant.limit, 3);
        assert_eq!(grant.current_plays, 1);
        assert_eq!(grant.remaining, 2);

        assert!(release(&quota, 1, &grant.reservation_id).await);
        // Second release of the same id: gone, but still not an error.
        assert!(!release(&quota, 1, &grant.reservation_id).await);
    }

    #[tokio::test]
    async fn release_of_unknown_reservation_is_a_noop() {
        let quota = quota();
        assert!(!release(&quota, 1, "db-0-deadbeef").await);
    }

    #[tokio::test]
    async fn reserve_denied_at_daily_limit() {
        let store = MockStore {
            player: true,
            daily_plays: 3,
        };
        let quota = quota();

        let err = reserve(&store, &quota, 1, &CoinKey::Id(7)).await.unwrap_err();
        assert!(matches!(err, ApiError::DailyLimitReached { .. }));
    }

    #[tokio::test]
    async fn reserve_requires_known_player() {
        let store = MockStore {
            player: false,
            daily_plays: 0,
        };
        let quota = quota();

        let err = reserve(&store, &quota, 1, &CoinKey::Id(7)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn marker_store_failure_still_grants_reservation() {
        let store = MockStore {
            player: true,
            daily_plays: 0,
        };
        let mut quota = quota();
        quota.fail_put = true;

        let grant = reserve(&store, &quota, 1, &CoinKey::Id(7)).await;
        assert!(grant.is_ok());
    }
}
