// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::{TransactionFilter, category_name, group_by_day};
use crate::format::{format_date, format_money};
use crate::models::{
    NewTransaction, RecurringConfig, RecurringFrequency, TransactionPatch, TransactionType,
};
use crate::store::{PreferenceStore, RecordStore, SqliteStore};
use crate::utils::{
    id_for_category, maybe_print_json, parse_decimal, parse_month, parse_timestamp, pretty_table,
};
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            SqliteStore::active(conn)?.delete_transaction(id)?;
            println!("Removed transaction {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn parse_type(s: &str) -> Result<TransactionType> {
    s.parse::<TransactionType>().map_err(|e| anyhow!(e))
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::active(conn)?;
    let kind = parse_type(sub.get_one::<String>("type").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_timestamp(d)?,
        None => Utc::now(),
    };
    let category_id = match sub.get_one::<String>("category") {
        Some(c) => Some(id_for_category(conn, store.user_id(), c)?),
        None => None,
    };
    let recurring_config = match sub.get_one::<String>("recurring") {
        Some(freq) => Some(RecurringConfig {
            frequency: freq.parse::<RecurringFrequency>().map_err(|e| anyhow!(e))?,
            end_date: match sub.get_one::<String>("until") {
                Some(u) => Some(parse_timestamp(u)?),
                None => None,
            },
            occurrences: sub.get_one::<u32>("occurrences").copied(),
        }),
        None => None,
    };

    let tx = NewTransaction {
        r#type: kind,
        amount,
        category_id,
        description: sub
            .get_one::<String>("description")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        date,
        is_recurring: recurring_config.is_some(),
        recurring_config,
        reminder_days: sub.get_one::<u32>("reminder-days").copied(),
    };
    let id = store
        .insert_transaction(&tx)
        .context("Failed to record transaction")?;
    let prefs = store.preferences()?;
    println!(
        "Recorded {} {} on {} (id {})",
        kind,
        format_money(amount, &prefs.currency, prefs.number_format),
        format_date(date, prefs.date_format),
        id
    );
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::active(conn)?;
    let id = *sub.get_one::<i64>("id").unwrap();
    let mut patch = TransactionPatch::default();
    if let Some(a) = sub.get_one::<String>("amount") {
        patch.amount = Some(parse_decimal(a)?);
    }
    if let Some(d) = sub.get_one::<String>("date") {
        patch.date = Some(parse_timestamp(d)?);
    }
    if let Some(c) = sub.get_one::<String>("category") {
        patch.category_id = Some(Some(id_for_category(conn, store.user_id(), c)?));
    }
    if let Some(d) = sub.get_one::<String>("description") {
        patch.description = Some(d.trim().to_string());
    }
    if patch == TransactionPatch::default() {
        println!("Nothing to change for transaction {}", id);
        return Ok(());
    }
    store.update_transaction(id, &patch)?;
    println!("Updated transaction {}", id);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub day: String,
    pub date: String,
    pub r#type: String,
    pub category: String,
    pub description: String,
    pub amount: String,
    pub recurring: bool,
}

/// Filtered rows, newest first, with money and dates rendered per preferences.
pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let store = SqliteStore::active(conn)?;
    let prefs = store.preferences()?;
    let txns = store.list_transactions()?;
    let cats = store.list_categories()?;

    let filter = TransactionFilter {
        kind: match sub.get_one::<String>("type") {
            Some(t) => Some(parse_type(t)?),
            None => None,
        },
        month: match sub.get_one::<String>("month") {
            Some(m) => Some(parse_month(m)?),
            None => None,
        },
        search: sub.get_one::<String>("search").cloned(),
    };
    let mut matched = filter.apply(&txns, &cats);
    if let Some(limit) = sub.get_one::<usize>("limit") {
        matched.truncate(*limit);
    }

    let mut rows = Vec::with_capacity(matched.len());
    for (day, items) in group_by_day(&matched) {
        let day_label = day.format("%B %-d, %Y").to_string();
        for t in items {
            rows.push(TransactionRow {
                id: t.id,
                day: day_label.clone(),
                date: format_date(t.date, prefs.date_format),
                r#type: t.r#type.to_string(),
                category: category_name(&cats, t.category_id).to_string(),
                description: t.description.clone(),
                amount: format_money(t.signed_amount(), &prefs.currency, prefs.number_format),
                recurring: t.is_recurring,
            });
        }
    }
    Ok(rows)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.r#type.clone(),
                    r.category.clone(),
                    r.description.clone(),
                    r.amount.clone(),
                    if r.recurring { "↻".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Type", "Category", "Description", "Amount", ""],
                rows
            )
        );
    }
    Ok(())
}
