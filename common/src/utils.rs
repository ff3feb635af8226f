use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{impl_from_str_for_enum, impl_to_string_for_enum};

/// Hard caps of the reward engine. Deliberately constants, not env config.
pub const DAILY_POINTS_CAP: i64 = 1000;
pub const AWARD_RATE_LIMIT: i64 = 50;
pub const AWARD_RATE_WINDOW_SECS: i64 = 3600;
pub const DEFAULT_MAX_PLAYS: i64 = 3;
pub const DEFAULT_MAX_POINTS: i64 = 1000;
pub const DEFAULT_PREMIUM_THRESHOLD: u64 = 1_000_000;
/// Neynar user score below this is treated as a bot/spam account.
pub const REPUTATION_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ScoreStatus {
    Pending,
    Complete,
}

impl_from_str_for_enum!(ScoreStatus, Pending, Complete);
impl_to_string_for_enum!(ScoreStatus, Pending, Complete);

/// Start of the current UTC calendar day. All daily windows are bounded by
/// this, never by a rolling 24h.
pub fn utc_day_start() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// `yyyymmdd` stamp used to scope Redis counter keys to the current UTC day.
pub fn utc_day_stamp() -> String {
    Utc::now().format("%Y%m%d").to_string()
}

pub fn secs_until_utc_midnight() -> i64 {
    let next_midnight = utc_day_start() + chrono::Duration::days(1);
    (next_midnight - Utc::now()).num_seconds().max(1)
}

pub fn next_utc_midnight() -> DateTime<Utc> {
    utc_day_start() + chrono::Duration::days(1)
}
