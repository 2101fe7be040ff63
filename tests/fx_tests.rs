// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use purseline::db;
use purseline::errors::FxError;
use purseline::fx::{
    CachedRateSource, RateSnapshot, RateSource, StaticRates, cache_snapshot, snapshot_from_json,
};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn snap(date: (i32, u32, u32), eur: Decimal) -> RateSnapshot {
    RateSnapshot::new(
        "usd",
        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        [
            ("eur".to_string(), eur),
            ("INR".to_string(), Decimal::new(83, 0)),
        ],
    )
}

#[test]
fn parses_latest_response() {
    let body = r#"{
        "result": "success",
        "base_code": "USD",
        "rates": { "USD": 1, "EUR": 0.5, "INR": 83.25, "BAD": 0 }
    }"#;
    let s = snapshot_from_json("USD", body).unwrap();
    assert_eq!(s.base, "USD");
    assert_eq!(s.rate("eur"), Some(Decimal::new(5, 1)));
    assert_eq!(s.rate("BAD"), None);
    assert_eq!(s.cross_rate("EUR", "USD"), Some(Decimal::new(2, 0)));
    // 1 EUR = 2 USD = 166.5 INR
    assert_eq!(s.cross_rate("EUR", "INR"), Some(Decimal::new(1665, 1)));
}

#[test]
fn upstream_error_is_reported() {
    let body = r#"{ "result": "error", "error-type": "unsupported-code" }"#;
    match snapshot_from_json("XXX", body) {
        Err(FxError::Upstream(reason)) => assert_eq!(reason, "unsupported-code"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        snapshot_from_json("USD", "not json"),
        Err(FxError::Upstream(_))
    ));
}

#[test]
fn cached_source_returns_latest_snapshot() {
    let conn = setup();
    assert!(matches!(
        CachedRateSource::new(&conn).snapshot("USD"),
        Err(FxError::NoSnapshot(_))
    ));

    cache_snapshot(&conn, &snap((2025, 3, 1), Decimal::new(90, 2))).unwrap();
    cache_snapshot(&conn, &snap((2025, 3, 2), Decimal::new(92, 2))).unwrap();
    // Re-caching the same day updates in place.
    cache_snapshot(&conn, &snap((2025, 3, 2), Decimal::new(93, 2))).unwrap();

    let s = CachedRateSource::new(&conn).snapshot("usd").unwrap();
    assert_eq!(s.date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    assert_eq!(s.rate("EUR"), Some(Decimal::new(93, 2)));
    assert_eq!(s.rate("USD"), Some(Decimal::ONE));

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM fx_rates", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 6);
}

#[test]
fn static_rates_only_serve_their_base() {
    let rates = StaticRates::new(snap((2025, 3, 1), Decimal::new(9, 1)));
    assert!(rates.snapshot("USD").is_ok());
    assert!(rates.snapshot("EUR").is_err());
    assert!(StaticRates::unavailable().snapshot("USD").is_err());
}
