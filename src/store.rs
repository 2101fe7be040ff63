// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Record and preference persistence.
//!
//! The conversion engine and the CLI only talk to the [`RecordStore`] and
//! [`PreferenceStore`] traits. Each call is atomic on its own; nothing here
//! wraps several records in one transaction.
//!
//! Every transaction, category and preference belongs to exactly one scope:
//! the signed-out ledger (`user_id IS NULL`, preferences in `settings`) or
//! one user (`user_id = id`, preferences on the `users` row). A scope's
//! amounts are all in that scope's currency.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::warn;

use crate::errors::{StoreError, StoreResult};
use crate::format::{DateFormat, NumberFormat};
use crate::models::{
    Category, CategoryPatch, NewCategory, NewTransaction, Preferences, RecurringConfig,
    Transaction, TransactionPatch, TransactionType, User, default_categories,
};
use crate::utils::{clear_setting, get_setting, set_setting};

pub trait RecordStore {
    fn list_transactions(&self) -> StoreResult<Vec<Transaction>>;
    fn get_transaction(&self, id: i64) -> StoreResult<Transaction>;
    fn insert_transaction(&self, tx: &NewTransaction) -> StoreResult<i64>;
    fn update_transaction(&self, id: i64, patch: &TransactionPatch) -> StoreResult<()>;
    fn delete_transaction(&self, id: i64) -> StoreResult<()>;

    fn list_categories(&self) -> StoreResult<Vec<Category>>;
    fn insert_category(&self, cat: &NewCategory) -> StoreResult<i64>;
    fn update_category(&self, id: i64, patch: &CategoryPatch) -> StoreResult<()>;
    fn delete_category(&self, id: i64) -> StoreResult<()>;
}

pub trait PreferenceStore {
    fn preferences(&self) -> StoreResult<Preferences>;
    fn set_currency(&self, code: &str) -> StoreResult<()>;
    fn set_date_format(&self, date_format: DateFormat) -> StoreResult<()>;
    fn set_number_format(&self, number_format: NumberFormat) -> StoreResult<()>;
    fn set_onboarded(&self, onboarded: bool) -> StoreResult<()>;
}

const ACTIVE_USER: &str = "active_user";

const TX_COLUMNS: &str = "id, type, amount, category_id, description, date, is_recurring, \
     recurring_config, reminder_days, created_at, updated_at";

const CAT_COLUMNS: &str = "id, name, type, icon, color, budget, is_default";

/// Largest magnitude accepted for an amount or a budget (10^20).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_661_992_960, 1_808_227_885, 5, false, 0);

/// SQLite-backed store, optionally scoped to one signed-in user.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
    user_id: Option<i64>,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            user_id: None,
        }
    }

    pub fn for_user(conn: &'c Connection, user_id: i64) -> Self {
        Self {
            conn,
            user_id: Some(user_id),
        }
    }

    /// Scoped to `settings.active_user` when someone is signed in.
    pub fn active(conn: &'c Connection) -> StoreResult<Self> {
        let user_id = match get_setting(conn, ACTIVE_USER)? {
            Some(v) => Some(v.parse::<i64>().map_err(|_| StoreError::Corrupt {
                entity: "setting",
                id: 0,
                field: ACTIVE_USER,
                value: v.clone(),
            })?),
            None => None,
        };
        Ok(Self { conn, user_id })
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Creates a profile with its own copy of the default categories.
    pub fn create_user(&self, name: &str, email: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO users(name, email) VALUES (?1, ?2)",
            params![name.trim(), email.trim()],
        )?;
        let id = self.conn.last_insert_rowid();
        let scoped = Self::for_user(self.conn, id);
        for cat in default_categories() {
            scoped.insert_category(&cat)?;
        }
        Ok(id)
    }

    pub fn find_user(&self, email: &str) -> StoreResult<Option<User>> {
        let u = self
            .conn
            .query_row(
                "SELECT id, name, email FROM users WHERE email=?1",
                params![email.trim()],
                |r| {
                    Ok(User {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        email: r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(u)
    }

    pub fn sign_in(conn: &'c Connection, user_id: i64) -> StoreResult<Self> {
        set_setting(conn, ACTIVE_USER, &user_id.to_string())?;
        Ok(Self::for_user(conn, user_id))
    }

    pub fn sign_out(conn: &'c Connection) -> StoreResult<()> {
        clear_setting(conn, ACTIVE_USER)?;
        Ok(())
    }

    fn category(&self, id: i64) -> StoreResult<Category> {
        let sql = format!("SELECT {CAT_COLUMNS} FROM categories WHERE id=?1 AND user_id IS ?2");
        let raw = self
            .conn
            .query_row(&sql, params![id, self.user_id], read_category)
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "category",
                id,
            })?;
        raw.into_category()
    }

    fn check_transaction(
        &self,
        kind: TransactionType,
        amount: Decimal,
        category_id: Option<i64>,
    ) -> StoreResult<()> {
        check_amount(amount)?;
        if let Some(cid) = category_id {
            let cat = self.category(cid)?;
            if cat.r#type != kind {
                return Err(StoreError::CategoryMismatch {
                    category_id: cid,
                    category_kind: cat.r#type.to_string(),
                    transaction_kind: kind.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Writes a preference for this scope only: the profile row when signed
    /// in, the local settings otherwise.
    fn write_preference(&self, column: &str, value: &str) -> StoreResult<()> {
        match self.user_id {
            Some(uid) => {
                let sql = format!("UPDATE users SET {column}=?1 WHERE id=?2");
                let n = self.conn.execute(&sql, params![value, uid])?;
                if n == 0 {
                    return Err(StoreError::NotFound { entity: "user", id: uid });
                }
            }
            None => set_setting(self.conn, column, value)?,
        }
        Ok(())
    }

    fn preference_value(&self, column: &str) -> StoreResult<Option<String>> {
        let Some(uid) = self.user_id else {
            return Ok(get_setting(self.conn, column)?);
        };
        let sql = format!("SELECT {column} FROM users WHERE id=?1");
        let v: Option<Option<String>> = self
            .conn
            .query_row(&sql, params![uid], |r| r.get(0))
            .optional()?;
        Ok(v.flatten())
    }
}

fn check_amount(amount: Decimal) -> StoreResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(StoreError::NegativeAmount(amount));
    }
    if amount > MAX_AMOUNT {
        return Err(StoreError::AmountOutOfRange(amount));
    }
    Ok(())
}

struct RawTransaction {
    id: i64,
    kind: String,
    amount: String,
    category_id: Option<i64>,
    description: String,
    date: String,
    is_recurring: bool,
    recurring_config: Option<String>,
    reminder_days: Option<u32>,
    created_at: String,
    updated_at: String,
}

fn read_transaction(r: &Row<'_>) -> rusqlite::Result<RawTransaction> {
    Ok(RawTransaction {
        id: r.get(0)?,
        kind: r.get(1)?,
        amount: r.get(2)?,
        category_id: r.get(3)?,
        description: r.get(4)?,
        date: r.get(5)?,
        is_recurring: r.get(6)?,
        recurring_config: r.get(7)?,
        reminder_days: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

fn corrupt(entity: &'static str, id: i64, field: &'static str, value: &str) -> StoreError {
    StoreError::Corrupt {
        entity,
        id,
        field,
        value: value.to_string(),
    }
}

fn parse_ts(id: i64, field: &'static str, s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| corrupt("transaction", id, field, s))
}

impl RawTransaction {
    fn into_transaction(self) -> StoreResult<Transaction> {
        let id = self.id;
        let r#type = self
            .kind
            .parse::<TransactionType>()
            .map_err(|_| corrupt("transaction", id, "type", &self.kind))?;
        let amount = self
            .amount
            .parse::<Decimal>()
            .map_err(|_| corrupt("transaction", id, "amount", &self.amount))?;
        let recurring_config = match self.recurring_config.as_deref() {
            Some(s) if !s.is_empty() => Some(serde_json::from_str::<RecurringConfig>(s)?),
            _ => None,
        };
        Ok(Transaction {
            id,
            r#type,
            amount,
            category_id: self.category_id,
            description: self.description,
            date: parse_ts(id, "date", &self.date)?,
            is_recurring: self.is_recurring,
            recurring_config,
            reminder_days: self.reminder_days,
            created_at: parse_ts(id, "created_at", &self.created_at)?,
            updated_at: parse_ts(id, "updated_at", &self.updated_at)?,
        })
    }
}

struct RawCategory {
    id: i64,
    name: String,
    kind: String,
    icon: String,
    color: String,
    budget: Option<String>,
    is_default: bool,
}

fn read_category(r: &Row<'_>) -> rusqlite::Result<RawCategory> {
    Ok(RawCategory {
        id: r.get(0)?,
        name: r.get(1)?,
        kind: r.get(2)?,
        icon: r.get(3)?,
        color: r.get(4)?,
        budget: r.get(5)?,
        is_default: r.get(6)?,
    })
}

impl RawCategory {
    fn into_category(self) -> StoreResult<Category> {
        let id = self.id;
        let r#type = self
            .kind
            .parse::<TransactionType>()
            .map_err(|_| corrupt("category", id, "type", &self.kind))?;
        let budget = match self.budget {
            Some(b) => Some(
                b.parse::<Decimal>()
                    .map_err(|_| corrupt("category", id, "budget", &b))?,
            ),
            None => None,
        };
        Ok(Category {
            id,
            name: self.name,
            r#type,
            icon: self.icon,
            color: self.color,
            budget,
            is_default: self.is_default,
        })
    }
}

fn config_json(cfg: Option<&RecurringConfig>) -> StoreResult<Option<String>> {
    Ok(match cfg {
        Some(c) => Some(serde_json::to_string(c)?),
        None => None,
    })
}

impl RecordStore for SqliteStore<'_> {
    fn list_transactions(&self) -> StoreResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE user_id IS ?1
             ORDER BY date DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![self.user_id], read_transaction)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_transaction()?);
        }
        Ok(out)
    }

    fn get_transaction(&self, id: i64) -> StoreResult<Transaction> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE id=?1 AND user_id IS ?2"
        );
        self.conn
            .query_row(&sql, params![id, self.user_id], read_transaction)
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "transaction",
                id,
            })?
            .into_transaction()
    }

    fn insert_transaction(&self, tx: &NewTransaction) -> StoreResult<i64> {
        self.check_transaction(tx.r#type, tx.amount, tx.category_id)?;
        let now = Utc::now().to_rfc3339();
        // A stored recurrence config always marks the row as recurring.
        let is_recurring = tx.is_recurring || tx.recurring_config.is_some();
        self.conn.execute(
            "INSERT INTO transactions(user_id, type, amount, category_id, description, date,
                 is_recurring, recurring_config, reminder_days, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                self.user_id,
                tx.r#type.as_str(),
                tx.amount.to_string(),
                tx.category_id,
                tx.description,
                tx.date.to_rfc3339(),
                is_recurring,
                config_json(tx.recurring_config.as_ref())?,
                tx.reminder_days,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_transaction(&self, id: i64, patch: &TransactionPatch) -> StoreResult<()> {
        let mut tx = self.get_transaction(id)?;
        if let Some(t) = patch.r#type {
            tx.r#type = t;
        }
        if let Some(a) = patch.amount {
            tx.amount = a;
        }
        if let Some(c) = patch.category_id {
            tx.category_id = c;
        }
        if let Some(d) = &patch.description {
            tx.description = d.clone();
        }
        if let Some(d) = patch.date {
            tx.date = d;
        }
        if let Some(cfg) = &patch.recurring_config {
            tx.recurring_config = cfg.clone();
            tx.is_recurring = cfg.is_some();
        }
        if let Some(r) = patch.reminder_days {
            tx.reminder_days = r;
        }
        // Amount-only patches skip the category lookup; the type cannot change.
        if patch.r#type.is_some() || patch.category_id.is_some() {
            self.check_transaction(tx.r#type, tx.amount, tx.category_id)?;
        } else {
            check_amount(tx.amount)?;
        }

        let n = self.conn.execute(
            "UPDATE transactions SET type=?1, amount=?2, category_id=?3, description=?4, date=?5,
                 is_recurring=?6, recurring_config=?7, reminder_days=?8, updated_at=?9
             WHERE id=?10",
            params![
                tx.r#type.as_str(),
                tx.amount.to_string(),
                tx.category_id,
                tx.description,
                tx.date.to_rfc3339(),
                tx.is_recurring,
                config_json(tx.recurring_config.as_ref())?,
                tx.reminder_days,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id,
            });
        }
        Ok(())
    }

    fn delete_transaction(&self, id: i64) -> StoreResult<()> {
        let n = self.conn.execute(
            "DELETE FROM transactions WHERE id=?1 AND user_id IS ?2",
            params![id, self.user_id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id,
            });
        }
        Ok(())
    }

    fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let sql = format!(
            "SELECT {CAT_COLUMNS} FROM categories
             WHERE user_id IS ?1 ORDER BY type, name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![self.user_id], read_category)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_category()?);
        }
        Ok(out)
    }

    fn insert_category(&self, cat: &NewCategory) -> StoreResult<i64> {
        if let Some(b) = cat.budget {
            check_amount(b)?;
        }
        self.conn.execute(
            "INSERT INTO categories(user_id, name, type, icon, color, budget, is_default)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.user_id,
                cat.name.trim(),
                cat.r#type.as_str(),
                cat.icon,
                cat.color,
                cat.budget.map(|b| b.to_string()),
                cat.is_default,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_category(&self, id: i64, patch: &CategoryPatch) -> StoreResult<()> {
        let mut cat = self.category(id)?;
        if let Some(n) = &patch.name {
            cat.name = n.trim().to_string();
        }
        if let Some(i) = &patch.icon {
            cat.icon = i.clone();
        }
        if let Some(c) = &patch.color {
            cat.color = c.clone();
        }
        if let Some(b) = patch.budget {
            if let Some(v) = b {
                check_amount(v)?;
            }
            cat.budget = b;
        }
        self.conn.execute(
            "UPDATE categories SET name=?1, icon=?2, color=?3, budget=?4 WHERE id=?5",
            params![
                cat.name,
                cat.icon,
                cat.color,
                cat.budget.map(|b| b.to_string()),
                id
            ],
        )?;
        Ok(())
    }

    fn delete_category(&self, id: i64) -> StoreResult<()> {
        let cat = self.category(id)?;
        if cat.is_default {
            return Err(StoreError::ProtectedCategory(id));
        }
        self.conn.execute(
            "DELETE FROM categories WHERE id=?1 AND user_id IS ?2",
            params![id, self.user_id],
        )?;
        Ok(())
    }
}

impl PreferenceStore for SqliteStore<'_> {
    fn preferences(&self) -> StoreResult<Preferences> {
        let defaults = Preferences::default();
        let currency = self
            .preference_value("currency")?
            .unwrap_or(defaults.currency);
        let date_format = match self.preference_value("date_format")? {
            Some(v) => v.parse::<DateFormat>().unwrap_or_else(|e| {
                warn!(error = %e, "stored date format not recognised, using default");
                defaults.date_format
            }),
            None => defaults.date_format,
        };
        let number_format = match self.preference_value("number_format")? {
            Some(v) => v.parse::<NumberFormat>().unwrap_or_else(|e| {
                warn!(error = %e, "stored number format not recognised, using default");
                defaults.number_format
            }),
            None => defaults.number_format,
        };
        let is_onboarded = match self.user_id {
            Some(uid) => self
                .conn
                .query_row(
                    "SELECT is_onboarded FROM users WHERE id=?1",
                    params![uid],
                    |r| r.get::<_, bool>(0),
                )
                .optional()?
                .unwrap_or(false),
            None => get_setting(self.conn, "is_onboarded")?.as_deref() == Some("true"),
        };
        Ok(Preferences {
            currency,
            date_format,
            number_format,
            is_onboarded,
        })
    }

    fn set_currency(&self, code: &str) -> StoreResult<()> {
        self.write_preference("currency", &code.trim().to_ascii_uppercase())
    }

    fn set_date_format(&self, date_format: DateFormat) -> StoreResult<()> {
        self.write_preference("date_format", date_format.pattern())
    }

    fn set_number_format(&self, number_format: NumberFormat) -> StoreResult<()> {
        self.write_preference("number_format", number_format.label())
    }

    fn set_onboarded(&self, onboarded: bool) -> StoreResult<()> {
        match self.user_id {
            Some(uid) => {
                self.conn.execute(
                    "UPDATE users SET is_onboarded=?1 WHERE id=?2",
                    params![onboarded, uid],
                )?;
            }
            None => set_setting(
                self.conn,
                "is_onboarded",
                if onboarded { "true" } else { "false" },
            )?,
        }
        Ok(())
    }
}
