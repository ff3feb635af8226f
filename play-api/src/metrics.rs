use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref PLAY_CHECKS: IntCounterVec = register_int_counter_vec!(
        "play_checks_total",
        "Eligibility verdicts issued, by reason code",
        &["reason"]
    )
    .unwrap();
    pub static ref AWARDS: IntCounterVec = register_int_counter_vec!(
        "awards_total",
        "Award requests, by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref POINTS_AWARDED: IntCounter =
        register_int_counter!("points_awarded_total", "Total ledger points granted").unwrap();
    pub static ref RESERVATIONS: IntCounterVec = register_int_counter_vec!(
        "reservations_total",
        "Reservation ledger operations, by action",
        &["action"]
    )
    .unwrap();
}

pub fn record_play_check(reason: &str) {
    PLAY_CHECKS.with_label_values(&[reason]).inc();
}

pub fn record_award(outcome: &str) {
    AWARDS.with_label_values(&[outcome]).inc();
}

pub fn record_points(points: i64) {
    POINTS_AWARDED.inc_by(points.max(0) as u64);
}

pub fn record_reservation(action: &str) {
    RESERVATIONS.with_label_values(&[action]).inc();
}

pub fn render() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}
