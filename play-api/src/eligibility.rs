use alloy_primitives::U256;
use serde::Serialize;

use erc20::minimum_token_units;

/// Closed set of verdict reasons. Serialized snake_case on the wire so the
/// frontend can switch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayReason {
    FirstTime,
    HasTokens,
    InsufficientTokens,
    NoWallet,
    DailyLimitReached,
    BalanceCheckFailed,
}

impl PlayReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayReason::FirstTime => "first_time",
            PlayReason::HasTokens => "has_tokens",
            PlayReason::InsufficientTokens => "insufficient_tokens",
            PlayReason::NoWallet => "no_wallet",
            PlayReason::DailyLimitReached => "daily_limit_reached",
            PlayReason::BalanceCheckFailed => "balance_check_failed",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayVerdict {
    pub can_play: bool,
    pub reason: PlayReason,
    pub has_played: bool,
    pub token_balance: String,
    pub daily_plays_remaining: i64,
    pub max_daily_plays: i64,
    pub current_daily_plays: i64,
}

/// Outcome of the I/O-free part of the decision: either settled, or we still
/// need a chain read for the premium-holder check.
#[derive(Debug)]
pub enum Gate {
    Settled(PlayVerdict),
    NeedsBalance { wallet: String },
}

/// Decision order, first match wins:
/// 1. daily limit is absolute, token ownership cannot bypass it;
/// 2. first play of a game is always free;
/// 3. repeat plays need a wallet;
/// 4. otherwise the token balance decides (resolved by `balance_gate`).
pub fn gate(
    max_daily_plays: i64,
    current_daily_plays: i64,
    has_played: bool,
    wallet_address: Option<&str>,
) -> Gate {
    let remaining = (max_daily_plays - current_daily_plays).max(0);

    if current_daily_plays >= max_daily_plays {
        return Gate::Settled(PlayVerdict {
            can_play: false,
            reason: PlayReason::DailyLimitReached,
            has_played,
            token_balance: "0".to_string(),
            daily_plays_remaining: 0,
            max_daily_plays,
            current_daily_plays,
        });
    }

    if !has_played {
        return Gate::Settled(PlayVerdict {
            can_play: true,
            reason: PlayReason::FirstTime,
            has_played: false,
            token_balance: "0".to_string(),
            daily_plays_remaining: remaining,
            max_daily_plays,
            current_daily_plays,
        });
    }

    match wallet_address {
        None | Some("") => Gate::Settled(PlayVerdict {
            can_play: false,
            reason: PlayReason::NoWallet,
            has_played: true,
            token_balance: "0".to_string(),
            daily_plays_remaining: remaining,
            max_daily_plays,
            current_daily_plays,
        }),
        Some(wallet) => Gate::NeedsBalance {
            wallet: wallet.to_string(),
        },
    }
}

/// Folds the oracle result into a final verdict. An RPC failure denies play
/// (fail closed) rather than guessing.
pub fn balance_gate(
    max_daily_plays: i64,
    current_daily_plays: i64,
    premium_threshold: u64,
    balance: anyhow::Result<(U256, u8)>,
) -> PlayVerdict {
    let remaining = (max_daily_plays - current_daily_plays).max(0);

    match balance {
        Ok((balance, decimals)) => {
            let minimum = minimum_token_units(premium_threshold, decimals);
            let has_tokens = balance >= minimum;
            PlayVerdict {
                can_play: has_tokens,
                reason: if has_tokens {
                    PlayReason::HasTokens
                } else {
                    PlayReason::InsufficientTokens
                },
                has_played: true,
                token_balance: balance.to_string(),
                daily_plays_remaining: remaining,
                max_daily_plays,
                current_daily_plays,
            }
        }
        Err(_) => PlayVerdict {
            can_play: false,
            reason: PlayReason::BalanceCheckFailed,
            has_played: true,
            token_balance: "0".to_string(),
            daily_plays_remaining: remaining,
            max_daily_plays,
            current_daily_plays,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled(gate: Gate) -> PlayVerdict {
        match gate {
            Gate::Settled(v) => v,
            Gate::NeedsBalance { .. } => panic!("expected settled verdict"),
        }
    }

    #[test]
    fn daily_limit_beats_everything() {
        // Even a fresh player with a wallet is denied once the limit is hit.
        let verdict = settled(gate(3, 3, false, Some("0xabc")));
        assert!(!verdict.can_play);
        assert_eq!(verdict.reason, PlayReason::DailyLimitReached);
        assert_eq!(verdict.daily_plays_remaining, 0);

        let verdict = settled(gate(3, 5, true, Some("0xabc")));
        assert_eq!(verdict.reason, PlayReason::DailyLimitReached);
    }

    #[test]
    fn first_play_is_free_without_wallet_or_tokens() {
        let verdict = settled(gate(3, 0, false, None));
        assert!(verdict.can_play);
        assert_eq!(verdict.reason, PlayReason::FirstTime);
        assert!(!verdict.has_played);
        assert_eq!(verdict.daily_plays_remaining, 3);
    }

    #[test]
    fn repeat_play_without_wallet_is_denied() {
        let verdict = settled(gate(3, 1, true, None));
        assert!(!verdict.can_play);
        assert_eq!(verdict.reason, PlayReason::NoWallet);

        // Empty string counts as no wallet.
        let verdict = settled(gate(3, 1, true, Some("")));
        assert_eq!(verdict.reason, PlayReason::NoWallet);
    }

    #[test]
    fn repeat_play_with_wallet_defers_to_balance_check() {
        match gate(3, 1, true, Some("0xabc")) {
            Gate::NeedsBalance { wallet } => assert_eq!(wallet, "0xabc"),
            Gate::Settled(_) => panic!("expected balance check"),
        }
    }

    #[test]
    fn premium_boundary_one_unit_below_denies_at_or_above_allows() {
        let minimum = minimum_token_units(1_000_000, 6);

        let below = balance_gate(3, 1, 1_000_000, Ok((minimum - U256::from(1u8), 6)));
        assert!(!below.can_play);
        assert_eq!(below.reason, PlayReason::InsufficientTokens);

        let at = balance_gate(3, 1, 1_000_000, Ok((minimum, 6)));
        assert!(at.can_play);
        assert_eq!(at.reason, PlayReason::HasTokens);

        let above = balance_gate(3, 1, 1_000_000, Ok((minimum + U256::from(1u8), 6)));
        assert!(above.can_play);
    }

    #[test]
    fn balance_reported_back_to_caller() {
        let verdict = balance_gate(3, 1, 1, Ok((U256::from(42u64), 0)));
        assert_eq!(verdict.token_balance, "42");
    }

    #[test]
    fn rpc_failure_fails_closed() {
        let verdict = balance_gate(3, 1, 1_000_000, Err(anyhow::anyhow!("rpc timeout")));
        assert!(!verdict.can_play);
        assert_eq!(verdict.reason, PlayReason::BalanceCheckFailed);
        assert_eq!(verdict.token_balance, "0");
    }

    #[test]
    fn reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&PlayReason::DailyLimitReached).unwrap();
        assert_eq!(json, "\"daily_limit_reached\"");
        let json = serde_json::to_string(&PlayReason::FirstTime).unwrap();
        assert_eq!(json, "\"first_time\"");
    }
}
