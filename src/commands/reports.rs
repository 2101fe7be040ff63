// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::{self, Dashboard, category_name};
use crate::config::AppConfig;
use crate::format::{format_date, format_money, format_number};
use crate::models::{Category, Preferences, Transaction};
use crate::store::{PreferenceStore, RecordStore, SqliteStore};
use crate::utils::{maybe_print_json, month_key, parse_month, pretty_table};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("dashboard", sub)) => {
            let r = build_dashboard(conn, cfg, sub)?;
            if !maybe_print_json(sub.get_flag("json"), &r.dashboard)? {
                print_dashboard(&r.dashboard, &r.prefs);
                print_recent(&r);
            }
        }
        Some(("categories", sub)) => {
            let r = build_dashboard(conn, cfg, sub)?;
            if !maybe_print_json(sub.get_flag("json"), &r.dashboard.categories)? {
                print_categories(&r.dashboard.categories.ranked, &r.prefs);
            }
        }
        _ => {}
    }
    Ok(())
}

const RECENT_ROWS: usize = 5;

pub struct DashboardReport {
    pub dashboard: Dashboard,
    pub prefs: Preferences,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
}

/// Dashboard for `--month` (default: the current UTC month).
pub fn build_dashboard(
    conn: &Connection,
    cfg: &AppConfig,
    sub: &clap::ArgMatches,
) -> Result<DashboardReport> {
    let store = SqliteStore::active(conn)?;
    let now = Utc::now();
    let month = match sub.get_one::<String>("month") {
        Some(m) => parse_month(m)?,
        None => month_key(now),
    };
    let txns = store.list_transactions()?;
    let cats = store.list_categories()?;
    let dashboard = aggregate::dashboard(&txns, &cats, &month, now, &cfg.savings);
    Ok(DashboardReport {
        dashboard,
        prefs: store.preferences()?,
        categories: cats,
        transactions: txns,
    })
}

fn print_recent(r: &DashboardReport) {
    let rows: Vec<Vec<String>> = aggregate::recent(&r.transactions, RECENT_ROWS)
        .into_iter()
        .map(|t| {
            vec![
                format_date(t.date, r.prefs.date_format),
                category_name(&r.categories, t.category_id).to_string(),
                t.description.clone(),
                format_money(t.signed_amount(), &r.prefs.currency, r.prefs.number_format),
            ]
        })
        .collect();
    if !rows.is_empty() {
        println!(
            "{}",
            pretty_table(&["Recent", "Category", "Description", "Amount"], rows)
        );
    }
}

fn print_dashboard(d: &Dashboard, prefs: &Preferences) {
    let money = |v| format_money(v, &prefs.currency, prefs.number_format);
    let rows = vec![
        vec!["Balance".into(), money(d.balance)],
        vec!["Income".into(), money(d.totals.inflow)],
        vec!["Expenses".into(), money(d.totals.outflow)],
        vec!["Available".into(), money(d.budget.available)],
        vec![
            "Spent / available".into(),
            format!(
                "{}% / {}% ({:?})",
                d.budget.spent_pct.round_dp(0),
                d.budget.available_pct.round_dp(0),
                d.budget.health
            ),
        ],
        vec![
            "Trend vs last month".into(),
            format!("{:+}% (net {} vs {})", d.trend.pct, money(d.trend.current), money(d.trend.previous)),
        ],
        vec![
            "Top category".into(),
            d.top_category
                .as_ref()
                .map(|c| format!("{} {}", c.name, money(c.total)))
                .unwrap_or_else(|| "-".into()),
        ],
        vec![
            "Savings rate".into(),
            format!("{}% ({:?})", d.savings_rate, d.savings_tier),
        ],
        vec![
            "Sparkline".into(),
            d.sparkline
                .iter()
                .map(|v| format_number(*v, prefs.number_format))
                .collect::<Vec<_>>()
                .join(" "),
        ],
    ];
    println!("{}", pretty_table(&[d.month.as_str(), ""], rows));
    if !d.categories.ranked.is_empty() {
        print_categories(d.categories.donut(), prefs);
    }
}

fn print_categories(cats: &[aggregate::CategoryTotal], prefs: &Preferences) {
    let rows = cats
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                format_money(c.total, &prefs.currency, prefs.number_format),
                c.budget
                    .map(|b| format_money(b, &prefs.currency, prefs.number_format))
                    .unwrap_or_default(),
                c.budget_pct
                    .map(|p| format!("{}%", p.round_dp(0)))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Spent", "Budget", "Used"], rows)
    );
}
