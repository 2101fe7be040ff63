// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::AppConfig;
use crate::convert::{self, ConversionCheckpoint};
use crate::errors::ConversionError;
use crate::format::{CURRENCIES, DateFormat, NumberFormat, currency_symbol};
use crate::fx::{CachedRateSource, HttpRateSource, RateSource};
use crate::store::{PreferenceStore, RecordStore, SqliteStore};
use crate::utils::{clear_setting, get_setting, maybe_print_json, pretty_table, set_setting};
use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;
use tracing::warn;

pub const PENDING_CONVERSION: &str = "pending_conversion";

/// Settings key of the checkpoint for one scope; each user converts alone.
fn checkpoint_key(user_id: Option<i64>) -> String {
    match user_id {
        Some(uid) => format!("{}:{}", PENDING_CONVERSION, uid),
        None => PENDING_CONVERSION.to_string(),
    }
}

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::active(conn)?;
    match m.subcommand() {
        Some(("show", sub)) => {
            let prefs = store.preferences()?;
            if !maybe_print_json(sub.get_flag("json"), &prefs)? {
                let rows = vec![
                    vec![
                        "currency".into(),
                        format!("{} ({})", prefs.currency, currency_symbol(&prefs.currency)),
                    ],
                    vec!["date_format".into(), prefs.date_format.to_string()],
                    vec!["number_format".into(), prefs.number_format.to_string()],
                    vec!["onboarded".into(), prefs.is_onboarded.to_string()],
                ];
                println!("{}", pretty_table(&["Preference", "Value"], rows));
            }
        }
        Some(("set-currency", sub)) => {
            let code = sub.get_one::<String>("currency").unwrap();
            set_currency(conn, cfg, &store, code, sub.get_flag("offline"))?;
        }
        Some(("set-date-format", sub)) => {
            let f: DateFormat = sub
                .get_one::<String>("format")
                .unwrap()
                .parse()
                .map_err(|e: String| anyhow!(e))?;
            store.set_date_format(f)?;
            println!("Date format set to {}", f);
        }
        Some(("set-number-format", sub)) => {
            let f: NumberFormat = sub
                .get_one::<String>("format")
                .unwrap()
                .parse()
                .map_err(|e: String| anyhow!(e))?;
            store.set_number_format(f)?;
            println!("Number format set to {}", f);
        }
        Some(("resume", _)) => resume(conn, &store)?,
        Some(("onboard", _)) => {
            store.set_onboarded(true)?;
            println!("Onboarding complete");
        }
        _ => {}
    }
    Ok(())
}

fn valid_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

fn set_currency(
    conn: &Connection,
    cfg: &AppConfig,
    store: &SqliteStore<'_>,
    code: &str,
    offline: bool,
) -> Result<()> {
    let new = convert::normalize_code(code);
    if !valid_code(&new) {
        bail!("Invalid currency code '{}', expected three letters", code.trim());
    }
    if load_checkpoint(conn, store.user_id())?.is_some() {
        bail!("A currency conversion is still pending; run `purseline prefs resume` first");
    }

    let old = store.preferences()?.currency;
    let txns = store.list_transactions()?;
    let cats = store.list_categories()?;
    let rates: Box<dyn RateSource + '_> = if offline {
        Box::new(CachedRateSource::new(conn))
    } else {
        Box::new(HttpRateSource::new(&cfg.rates)?)
    };

    let outcome = convert::change_currency(
        &old,
        &new,
        &txns,
        &cats,
        rates.as_ref(),
        &cfg.rates.base,
        store,
    );
    match outcome {
        Ok(outcome) => {
            match outcome.factor {
                Some(f) => println!(
                    "Currency changed {} -> {} (x{}), {} amounts and budgets converted",
                    old, outcome.currency, f, outcome.writes
                ),
                None => println!("Currency set to {}", outcome.currency),
            }
            Ok(())
        }
        Err(ConversionError::PartialWriteFailure {
            checkpoint,
            failures,
        }) => {
            save_checkpoint(conn, store.user_id(), &checkpoint)?;
            for (id, reason) in &failures {
                eprintln!("record {}: {}", id, reason);
            }
            bail!(
                "{} of {} writes failed; currency stays {}. Run `purseline prefs resume` to finish",
                failures.len(),
                checkpoint.completed.len()
                    + checkpoint.pending.len()
                    + checkpoint.completed_budgets.len()
                    + checkpoint.pending_budgets.len(),
                checkpoint.from
            )
        }
        Err(ConversionError::PreferenceWriteFailure { checkpoint, reason }) => {
            save_checkpoint(conn, store.user_id(), &checkpoint)?;
            bail!(
                "Amounts are now in {} but the currency preference was not saved ({}). Run `purseline prefs resume` to finish",
                checkpoint.to,
                reason
            )
        }
        Err(e) => Err(e.into()),
    }
}

fn resume(conn: &Connection, store: &SqliteStore<'_>) -> Result<()> {
    let key = checkpoint_key(store.user_id());
    let Some(checkpoint) = load_checkpoint(conn, store.user_id())? else {
        println!("No pending conversion");
        return Ok(());
    };
    match convert::resume(&checkpoint, store) {
        Ok(outcome) => {
            clear_setting(conn, &key)?;
            println!(
                "Conversion {} -> {} finished, {} remaining writes applied",
                checkpoint.from, outcome.currency, outcome.writes
            );
            Ok(())
        }
        Err(ConversionError::PartialWriteFailure { checkpoint, failures }) => {
            save_checkpoint(conn, store.user_id(), &checkpoint)?;
            bail!(
                "{} writes still failed; try `purseline prefs resume` again",
                failures.len()
            )
        }
        Err(ConversionError::PreferenceWriteFailure { checkpoint, reason }) => {
            save_checkpoint(conn, store.user_id(), &checkpoint)?;
            bail!(
                "Currency preference still not saved ({}); try `purseline prefs resume` again",
                reason
            )
        }
        Err(e) => Err(e.into()),
    }
}

/// Interrupted conversion of one scope persisted by `set-currency`, if any.
pub fn load_checkpoint(
    conn: &Connection,
    user_id: Option<i64>,
) -> Result<Option<ConversionCheckpoint>> {
    let Some(raw) = get_setting(conn, &checkpoint_key(user_id))? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(cp) => Ok(Some(cp)),
        Err(e) => {
            warn!(error = %e, "unreadable conversion checkpoint");
            Err(anyhow!(e)).context("Pending conversion checkpoint is corrupt")
        }
    }
}

pub fn save_checkpoint(
    conn: &Connection,
    user_id: Option<i64>,
    checkpoint: &ConversionCheckpoint,
) -> Result<()> {
    set_setting(conn, &checkpoint_key(user_id), &serde_json::to_string(checkpoint)?)?;
    Ok(())
}

pub fn list_currencies() {
    let rows = CURRENCIES
        .iter()
        .map(|c| vec![c.code.to_string(), c.name.to_string(), c.symbol.to_string()])
        .collect();
    println!("{}", pretty_table(&["Code", "Name", "Symbol"], rows));
}
