// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Exchange rate snapshots.
//!
//! A snapshot maps currency codes to "units per one unit of the base". The
//! gateway does no business logic: it either returns a snapshot or fails.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::config::RatesConfig;
use crate::errors::FxError;
use crate::utils::http_client;

#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base: String,
    pub date: NaiveDate,
    pub rates: BTreeMap<String, Decimal>,
}

impl RateSnapshot {
    pub fn new(base: &str, date: NaiveDate, rates: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        let base = base.trim().to_ascii_uppercase();
        let mut map: BTreeMap<String, Decimal> = rates
            .into_iter()
            .filter(|(_, r)| *r > Decimal::ZERO)
            .map(|(c, r)| (c.trim().to_ascii_uppercase(), r))
            .collect();
        map.insert(base.clone(), Decimal::ONE);
        Self {
            base,
            date,
            rates: map,
        }
    }

    pub fn rate(&self, code: &str) -> Option<Decimal> {
        self.rates
            .get(&code.trim().to_ascii_uppercase())
            .copied()
            .filter(|r| !r.is_zero())
    }

    /// Units of `to` per one unit of `from`.
    pub fn cross_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let f = self.rate(from)?;
        let t = self.rate(to)?;
        t.checked_div(f)
    }
}

pub trait RateSource {
    fn snapshot(&self, base: &str) -> Result<RateSnapshot, FxError>;
}

/// Live rates from an `open.er-api.com`-compatible endpoint.
pub struct HttpRateSource {
    url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

impl HttpRateSource {
    pub fn new(cfg: &RatesConfig) -> Result<Self, FxError> {
        Ok(Self {
            url: cfg.url.trim_end_matches('/').to_string(),
            client: http_client(cfg.timeout_secs)?,
        })
    }
}

impl RateSource for HttpRateSource {
    fn snapshot(&self, base: &str) -> Result<RateSnapshot, FxError> {
        let url = format!("{}/{}", self.url, base.trim().to_ascii_uppercase());
        debug!(%url, "fetching exchange rates");
        let resp = self.client.get(&url).send()?.error_for_status()?;
        let body: LatestResponse = resp.json()?;
        parse_latest(base, body)
    }
}

fn parse_latest(base: &str, body: LatestResponse) -> Result<RateSnapshot, FxError> {
    if body.result != "success" {
        let reason = body.error_type.unwrap_or(body.result);
        warn!(%reason, "rate source rejected the request");
        return Err(FxError::Upstream(reason));
    }
    let rates = body.rates.into_iter().filter_map(|(code, r)| {
        if !r.is_finite() {
            return None;
        }
        Decimal::try_from(r).ok().map(|d| (code, d))
    });
    let snap = RateSnapshot::new(base, Utc::now().date_naive(), rates);
    info!(base = %snap.base, count = snap.rates.len(), "exchange rates fetched");
    Ok(snap)
}

/// Parses a raw `latest` response body. Exposed for offline snapshots.
pub fn snapshot_from_json(base: &str, json: &str) -> Result<RateSnapshot, FxError> {
    let body: LatestResponse = serde_json::from_str(json)
        .map_err(|e| FxError::Upstream(format!("malformed response: {}", e)))?;
    parse_latest(base, body)
}

/// Most recent snapshot previously stored with [`cache_snapshot`].
pub struct CachedRateSource<'c> {
    conn: &'c Connection,
}

impl<'c> CachedRateSource<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl RateSource for CachedRateSource<'_> {
    fn snapshot(&self, base: &str) -> Result<RateSnapshot, FxError> {
        let base = base.trim().to_ascii_uppercase();
        let latest: Option<String> = self
            .conn
            .query_row(
                "SELECT MAX(date) FROM fx_rates WHERE base=?1",
                params![base],
                |r| r.get(0),
            )
            .optional()?
            .flatten();
        let Some(date_s) = latest else {
            return Err(FxError::NoSnapshot(base));
        };
        let date = NaiveDate::parse_from_str(&date_s, "%Y-%m-%d")
            .map_err(|_| FxError::Upstream(format!("invalid cached date '{}'", date_s)))?;

        let mut stmt = self
            .conn
            .prepare("SELECT quote, rate FROM fx_rates WHERE base=?1 AND date=?2")?;
        let rows = stmt.query_map(params![base, date_s], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut rates = Vec::new();
        for row in rows {
            let (quote, rate_s) = row?;
            match rate_s.parse::<Decimal>() {
                Ok(r) => rates.push((quote, r)),
                Err(_) => warn!(%quote, rate = %rate_s, "skipping unparsable cached rate"),
            }
        }
        Ok(RateSnapshot::new(&base, date, rates))
    }
}

/// Fixed in-memory rates.
#[derive(Debug, Clone, Default)]
pub struct StaticRates {
    snapshot: Option<RateSnapshot>,
}

impl StaticRates {
    pub fn new(snapshot: RateSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    /// A source that always fails, as if the network were down.
    pub fn unavailable() -> Self {
        Self { snapshot: None }
    }
}

impl RateSource for StaticRates {
    fn snapshot(&self, base: &str) -> Result<RateSnapshot, FxError> {
        match &self.snapshot {
            Some(s) if s.base.eq_ignore_ascii_case(base.trim()) => Ok(s.clone()),
            _ => Err(FxError::NoSnapshot(base.trim().to_ascii_uppercase())),
        }
    }
}

pub fn cache_snapshot(conn: &Connection, snap: &RateSnapshot) -> Result<usize, FxError> {
    let date = snap.date.to_string();
    let mut n = 0;
    for (quote, rate) in &snap.rates {
        n += conn.execute(
            "INSERT INTO fx_rates(date, base, quote, rate) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date, base, quote) DO UPDATE SET rate=excluded.rate",
            params![date, snap.base, quote, rate.to_string()],
        )?;
    }
    debug!(base = %snap.base, %date, rows = n, "cached rate snapshot");
    Ok(n)
}
