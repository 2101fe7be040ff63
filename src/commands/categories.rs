// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::format::format_money;
use crate::models::{CategoryPatch, NewCategory, TransactionType};
use crate::store::{PreferenceStore, RecordStore, SqliteStore};
use crate::utils::{id_for_category, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::active(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            let kind = sub
                .get_one::<String>("type")
                .unwrap()
                .parse::<TransactionType>()
                .map_err(|e| anyhow!(e))?;
            let budget = match sub.get_one::<String>("budget") {
                Some(b) => Some(parse_decimal(b)?),
                None => None,
            };
            store.insert_category(&NewCategory {
                name: name.clone(),
                r#type: kind,
                icon: sub.get_one::<String>("icon").unwrap().to_string(),
                color: sub.get_one::<String>("color").unwrap().to_string(),
                budget,
                is_default: false,
            })?;
            println!("Added {} category '{}'", kind, name);
        }
        Some(("list", sub)) => {
            let cats = store.list_categories()?;
            if !maybe_print_json(sub.get_flag("json"), &cats)? {
                let prefs = store.preferences()?;
                let rows = cats
                    .iter()
                    .map(|c| {
                        vec![
                            c.name.clone(),
                            c.r#type.to_string(),
                            c.icon.clone(),
                            c.color.clone(),
                            c.budget
                                .map(|b| format_money(b, &prefs.currency, prefs.number_format))
                                .unwrap_or_default(),
                            if c.is_default { "yes".into() } else { String::new() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Category", "Type", "Icon", "Color", "Budget", "Default"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_category(conn, store.user_id(), name)?;
            store.delete_category(id)?;
            println!("Removed category '{}'", name.trim());
        }
        Some(("set-budget", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_category(conn, store.user_id(), name)?;
            let budget = if sub.get_flag("clear") {
                None
            } else {
                Some(parse_decimal(sub.get_one::<String>("amount").unwrap())?)
            };
            store.update_category(
                id,
                &CategoryPatch {
                    budget: Some(budget),
                    ..CategoryPatch::default()
                },
            )?;
            match budget {
                Some(b) => println!("Budget for '{}' set to {}", name.trim(), b),
                None => println!("Budget for '{}' cleared", name.trim()),
            }
        }
        _ => {}
    }
    Ok(())
}
