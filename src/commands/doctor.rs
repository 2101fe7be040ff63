// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::prefs::load_checkpoint;
use crate::config::AppConfig;
use crate::fx::{CachedRateSource, RateSource};
use crate::models::TransactionType;
use crate::store::{PreferenceStore, RecordStore, SqliteStore};
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;

/// Problems found in the ledger, as `(issue, detail)` pairs.
pub fn diagnose(conn: &Connection, cfg: &AppConfig) -> Result<Vec<(String, String)>> {
    let store = SqliteStore::active(conn)?;
    let mut out = Vec::new();

    match load_checkpoint(conn, store.user_id()) {
        Ok(Some(cp)) if cp.writes_done() => out.push((
            "pending_conversion".into(),
            format!("{} -> {}, only the currency preference left", cp.from, cp.to),
        )),
        Ok(Some(cp)) => out.push((
            "pending_conversion".into(),
            format!(
                "{} -> {}, {} amounts and {} budgets left",
                cp.from,
                cp.to,
                cp.pending.len(),
                cp.pending_budgets.len()
            ),
        )),
        Ok(None) => {}
        Err(e) => out.push(("corrupt_checkpoint".into(), e.to_string())),
    }

    let cats: HashMap<i64, TransactionType> = store
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.r#type))
        .collect();
    for t in store.list_transactions()? {
        match t.category_id.map(|id| cats.get(&id)) {
            None => out.push(("uncategorized".into(), format!("transaction {}", t.id))),
            Some(None) => out.push((
                "unknown_category".into(),
                format!("transaction {}", t.id),
            )),
            Some(Some(k)) if *k != t.r#type => out.push((
                "category_type_mismatch".into(),
                format!("transaction {} is {} in a {} category", t.id, t.r#type, k),
            )),
            Some(Some(_)) => {}
        }
    }

    let currency = store.preferences()?.currency;
    let cached = CachedRateSource::new(conn)
        .snapshot(&cfg.rates.base)
        .ok()
        .and_then(|s| s.rate(&currency));
    if cached.is_none() {
        out.push((
            "missing_fx".into(),
            format!("no cached {} rate for {}; offline switches will fail", cfg.rates.base, currency),
        ));
    }
    Ok(out)
}

pub fn handle(conn: &Connection, cfg: &AppConfig) -> Result<()> {
    let rows: Vec<Vec<String>> = diagnose(conn, cfg)?
        .into_iter()
        .map(|(issue, detail)| vec![issue, detail])
        .collect();
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
