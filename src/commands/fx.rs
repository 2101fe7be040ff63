// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::AppConfig;
use crate::fx::{CachedRateSource, HttpRateSource, RateSource, cache_snapshot};
use crate::utils::{parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", sub)) => {
            let base = sub
                .get_one::<String>("base")
                .cloned()
                .unwrap_or_else(|| cfg.rates.base.clone());
            let snap = HttpRateSource::new(&cfg.rates)?.snapshot(&base)?;
            let n = cache_snapshot(conn, &snap)?;
            println!(
                "Cached {} rates for {} as of {} ({} rows written)",
                snap.rates.len(),
                snap.base,
                snap.date,
                n
            );
        }
        Some(("list", sub)) => {
            let base = sub.get_one::<String>("base").map(|s| s.to_uppercase());
            list_rates(conn, base.as_deref())?;
        }
        Some(("convert", sub)) => convert_amount(conn, cfg, sub)?,
        _ => {}
    }
    Ok(())
}

fn list_rates(conn: &Connection, base: Option<&str>) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT date, base, quote, rate FROM fx_rates
         WHERE (?1 IS NULL OR base=?1)
         ORDER BY date DESC, base, quote LIMIT 200",
    )?;
    let rows = stmt.query_map(params![base], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (d, b, q, r) = row?;
        data.push(vec![d, b, q, r]);
    }
    println!("{}", pretty_table(&["Date", "Base", "Quote", "Rate"], data));
    Ok(())
}

fn convert_amount(conn: &Connection, cfg: &AppConfig, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let from = sub.get_one::<String>("from").unwrap().trim().to_uppercase();
    let to = sub.get_one::<String>("to").unwrap().trim().to_uppercase();
    let snap = if sub.get_flag("offline") {
        CachedRateSource::new(conn).snapshot(&cfg.rates.base)?
    } else {
        HttpRateSource::new(&cfg.rates)?.snapshot(&cfg.rates.base)?
    };
    let rate = snap
        .cross_rate(&from, &to)
        .ok_or_else(|| anyhow!("No rate between {} and {} in the {} snapshot", from, to, snap.date))?;
    let res = amount
        .checked_mul(rate)
        .ok_or_else(|| anyhow!("Converted amount overflows"))?;
    println!("{} {} -> {:.4} {} (rate {})", amount, from, res, to, rate);
    Ok(())
}
