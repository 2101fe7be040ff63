// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::models::default_categories;
use crate::store::{RecordStore, SqliteStore};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Purseline", "purseline"));

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP.0, APP.1, APP.2)
}

pub fn db_path(cfg: &AppConfig) -> Result<PathBuf> {
    if let Some(p) = &cfg.database_path {
        return Ok(p.clone());
    }
    let proj = project_dirs().context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("purseline.sqlite"))
}

pub fn open_or_init(cfg: &AppConfig) -> Result<Connection> {
    let path = db_path(cfg)?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    seed_categories(&conn)?;
    debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        currency TEXT,
        date_format TEXT,
        number_format TEXT,
        is_onboarded INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('inflow','outflow')),
        icon TEXT NOT NULL,
        color TEXT NOT NULL,
        budget TEXT,
        is_default INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    -- amount is always in the currency held by settings.currency
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        type TEXT NOT NULL CHECK(type IN ('inflow','outflow')),
        amount TEXT NOT NULL,
        category_id INTEGER,
        description TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL,
        is_recurring INTEGER NOT NULL DEFAULT 0,
        recurring_config TEXT,
        reminder_days INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

    -- FX snapshots: 1 base = rate quote
    CREATE TABLE IF NOT EXISTS fx_rates(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        base TEXT NOT NULL,
        quote TEXT NOT NULL,
        rate TEXT NOT NULL,
        UNIQUE(date, base, quote)
    );
    "#,
    )
}

/// Inserts the default categories when the table is empty.
/// Gives the signed-out ledger and every profile without categories the
/// default set. Returns the number of categories inserted.
pub fn seed_categories(conn: &Connection) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id")?;
    let user_ids = stmt
        .query_map([], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    let scopes = std::iter::once(SqliteStore::new(conn))
        .chain(user_ids.into_iter().map(|id| SqliteStore::for_user(conn, id)));

    let mut inserted = 0;
    for store in scopes {
        if !store.list_categories()?.is_empty() {
            continue;
        }
        for cat in &default_categories() {
            store.insert_category(cat)?;
            inserted += 1;
        }
        info!(user_id = ?store.user_id(), "seeded default categories");
    }
    Ok(inserted)
}
