// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, TimeZone, Utc};
use purseline::aggregate;
use purseline::convert::{self, ConversionPlan, StagedBudget};
use purseline::db;
use purseline::errors::{ConversionError, StoreError, StoreResult};
use purseline::format::{DateFormat, NumberFormat};
use purseline::fx::{RateSnapshot, StaticRates};
use purseline::models::{
    Category, CategoryPatch, NewCategory, NewTransaction, Preferences, Transaction,
    TransactionPatch, TransactionType,
};
use purseline::store::{PreferenceStore, RecordStore, SqliteStore};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashSet;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    db::seed_categories(&conn).unwrap();
    conn
}

fn usd_eur() -> RateSnapshot {
    RateSnapshot::new(
        "USD",
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        [("EUR".to_string(), Decimal::new(5, 1))],
    )
}

fn add(store: &SqliteStore<'_>, kind: TransactionType, amount: i64) -> i64 {
    let date = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    store
        .insert_transaction(&NewTransaction::new(kind, Decimal::new(amount, 0), date))
        .unwrap()
}

/// Delegates to SQLite but refuses amount writes for chosen ids and,
/// optionally, the currency preference.
struct FlakyStore<'c> {
    inner: SqliteStore<'c>,
    fail_ids: HashSet<i64>,
    fail_currency: bool,
}

impl RecordStore for FlakyStore<'_> {
    fn list_transactions(&self) -> StoreResult<Vec<Transaction>> {
        self.inner.list_transactions()
    }
    fn get_transaction(&self, id: i64) -> StoreResult<Transaction> {
        self.inner.get_transaction(id)
    }
    fn insert_transaction(&self, tx: &NewTransaction) -> StoreResult<i64> {
        self.inner.insert_transaction(tx)
    }
    fn update_transaction(&self, id: i64, patch: &TransactionPatch) -> StoreResult<()> {
        if self.fail_ids.contains(&id) {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id,
            });
        }
        self.inner.update_transaction(id, patch)
    }
    fn delete_transaction(&self, id: i64) -> StoreResult<()> {
        self.inner.delete_transaction(id)
    }
    fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.inner.list_categories()
    }
    fn insert_category(&self, cat: &NewCategory) -> StoreResult<i64> {
        self.inner.insert_category(cat)
    }
    fn update_category(&self, id: i64, patch: &CategoryPatch) -> StoreResult<()> {
        self.inner.update_category(id, patch)
    }
    fn delete_category(&self, id: i64) -> StoreResult<()> {
        self.inner.delete_category(id)
    }
}

impl PreferenceStore for FlakyStore<'_> {
    fn preferences(&self) -> StoreResult<Preferences> {
        self.inner.preferences()
    }
    fn set_currency(&self, code: &str) -> StoreResult<()> {
        if self.fail_currency {
            return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.inner.set_currency(code)
    }
    fn set_date_format(&self, date_format: DateFormat) -> StoreResult<()> {
        self.inner.set_date_format(date_format)
    }
    fn set_number_format(&self, number_format: NumberFormat) -> StoreResult<()> {
        self.inner.set_number_format(number_format)
    }
    fn set_onboarded(&self, onboarded: bool) -> StoreResult<()> {
        self.inner.set_onboarded(onboarded)
    }
}

#[test]
fn same_currency_is_a_no_op() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let id = add(&store, TransactionType::Outflow, 42);
    let txns = store.list_transactions().unwrap();

    let out = convert::change_currency(
        "USD",
        " usd ",
        &txns,
        &[],
        &StaticRates::unavailable(),
        "USD",
        &store,
    )
    .unwrap();
    assert_eq!(out.writes, 0);
    assert_eq!(out.factor, None);
    assert_eq!(out.transactions, txns);
    assert_eq!(store.get_transaction(id).unwrap().amount, Decimal::new(42, 0));
}

#[test]
fn converts_every_amount_then_switches_currency() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let a = add(&store, TransactionType::Inflow, 1000);
    let b = add(&store, TransactionType::Outflow, 250);
    let txns = store.list_transactions().unwrap();

    let out = convert::change_currency(
        "USD",
        "EUR",
        &txns,
        &[],
        &StaticRates::new(usd_eur()),
        "USD",
        &store,
    )
    .unwrap();
    assert_eq!(out.currency, "EUR");
    assert_eq!(out.factor, Some(Decimal::new(5, 1)));
    assert_eq!(out.writes, 2);
    assert_eq!(store.get_transaction(a).unwrap().amount, Decimal::new(500, 0));
    assert_eq!(store.get_transaction(b).unwrap().amount, Decimal::new(125, 0));
    assert_eq!(store.preferences().unwrap().currency, "EUR");

    // Converting back restores the starting amounts.
    let txns = store.list_transactions().unwrap();
    convert::change_currency(
        "EUR",
        "USD",
        &txns,
        &[],
        &StaticRates::new(usd_eur()),
        "USD",
        &store,
    )
    .unwrap();
    assert_eq!(store.get_transaction(a).unwrap().amount, Decimal::new(1000, 0));
}

#[test]
fn empty_ledger_switches_without_rates() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let out = convert::change_currency(
        "USD",
        "JPY",
        &[],
        &[],
        &StaticRates::unavailable(),
        "USD",
        &store,
    )
    .unwrap();
    assert_eq!(out.currency, "JPY");
    assert_eq!(out.writes, 0);
    assert_eq!(store.preferences().unwrap().currency, "JPY");
}

#[test]
fn missing_rates_leave_ledger_and_preference_untouched() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let id = add(&store, TransactionType::Outflow, 80);
    let txns = store.list_transactions().unwrap();

    let err = convert::change_currency(
        "USD",
        "EUR",
        &txns,
        &[],
        &StaticRates::unavailable(),
        "USD",
        &store,
    )
    .unwrap_err();
    assert!(matches!(err, ConversionError::RateUnavailable { .. }));
    assert_eq!(store.get_transaction(id).unwrap().amount, Decimal::new(80, 0));
    assert_eq!(store.preferences().unwrap().currency, "USD");

    // A snapshot lacking the target code is just as unusable.
    let err = convert::plan_conversion("USD", "CHF", Some(&usd_eur()), &txns, &[]).unwrap_err();
    assert!(matches!(err, ConversionError::RateUnavailable { ref to, .. } if to == "CHF"));
}

#[test]
fn duplicate_ids_are_converted_once() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    add(&store, TransactionType::Outflow, 10);
    let mut txns = store.list_transactions().unwrap();
    txns.push(txns[0].clone());

    match convert::plan_conversion("USD", "EUR", Some(&usd_eur()), &txns, &[]).unwrap() {
        ConversionPlan::Rewrite {
            staged,
            transactions,
            ..
        } => {
            assert_eq!(staged.len(), 1);
            assert_eq!(transactions.len(), 1);
            assert_eq!(staged[0].new_amount, Decimal::new(5, 0));
        }
        other => panic!("unexpected plan {:?}", other),
    }
}

#[test]
fn partial_failure_keeps_preference_and_resume_finishes() {
    let conn = setup();
    let plain = SqliteStore::new(&conn);
    let a = add(&plain, TransactionType::Inflow, 1000);
    let b = add(&plain, TransactionType::Outflow, 300);
    let c = add(&plain, TransactionType::Outflow, 100);
    let txns = plain.list_transactions().unwrap();

    let flaky = FlakyStore {
        inner: SqliteStore::new(&conn),
        fail_ids: HashSet::from([b]),
        fail_currency: false,
    };
    let err = convert::change_currency(
        "USD",
        "EUR",
        &txns,
        &[],
        &StaticRates::new(usd_eur()),
        "USD",
        &flaky,
    )
    .unwrap_err();
    let checkpoint = match err {
        ConversionError::PartialWriteFailure {
            checkpoint,
            failures,
        } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, b);
            checkpoint
        }
        other => panic!("unexpected error {:?}", other),
    };
    assert_eq!(checkpoint.pending.len(), 1);
    assert_eq!(checkpoint.pending[0].id, b);
    assert!(checkpoint.completed.contains(&a) && checkpoint.completed.contains(&c));
    assert_eq!(plain.preferences().unwrap().currency, "USD");
    assert_eq!(plain.get_transaction(a).unwrap().amount, Decimal::new(500, 0));
    assert_eq!(plain.get_transaction(b).unwrap().amount, Decimal::new(300, 0));

    let out = convert::resume(&checkpoint, &plain).unwrap();
    assert_eq!(out.currency, "EUR");
    assert_eq!(out.writes, 1);
    assert_eq!(plain.preferences().unwrap().currency, "EUR");
    assert_eq!(plain.get_transaction(a).unwrap().amount, Decimal::new(500, 0));
    assert_eq!(plain.get_transaction(b).unwrap().amount, Decimal::new(150, 0));
    assert_eq!(plain.get_transaction(c).unwrap().amount, Decimal::new(50, 0));
}

fn budgeted(store: &SqliteStore<'_>, name: &str, budget: i64) -> i64 {
    store
        .insert_category(&NewCategory {
            name: name.into(),
            r#type: TransactionType::Outflow,
            icon: "pricetag".into(),
            color: "#123456".into(),
            budget: Some(Decimal::new(budget, 0)),
            is_default: false,
        })
        .unwrap()
}

#[test]
fn budgets_follow_the_currency() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let groceries = budgeted(&store, "Groceries", 200);
    let date = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    store
        .insert_transaction(
            &NewTransaction::new(TransactionType::Outflow, Decimal::new(100, 0), date)
                .with_category(groceries),
        )
        .unwrap();
    let txns = store.list_transactions().unwrap();
    let cats = store.list_categories().unwrap();
    let used_before = aggregate::category_breakdown(&txns, &cats, "2025-03").ranked[0].budget_pct;

    let out = convert::change_currency(
        "USD",
        "EUR",
        &txns,
        &cats,
        &StaticRates::new(usd_eur()),
        "USD",
        &store,
    )
    .unwrap();
    assert_eq!(out.writes, 2);

    let txns = store.list_transactions().unwrap();
    let cats = store.list_categories().unwrap();
    let g = cats.iter().find(|c| c.id == groceries).unwrap();
    assert_eq!(g.budget, Some(Decimal::new(100, 0)));
    assert_eq!(txns[0].amount, Decimal::new(50, 0));
    let used_after = aggregate::category_breakdown(&txns, &cats, "2025-03").ranked[0].budget_pct;
    assert_eq!(used_before, Some(Decimal::new(50, 0)));
    assert_eq!(used_after, used_before);
}

#[test]
fn budgets_alone_still_need_rates() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let id = budgeted(&store, "Rent", 900);
    let cats = store.list_categories().unwrap();

    let err = convert::plan_conversion("USD", "EUR", None, &[], &cats).unwrap_err();
    assert!(matches!(err, ConversionError::RateUnavailable { .. }));

    match convert::plan_conversion("USD", "EUR", Some(&usd_eur()), &[], &cats).unwrap() {
        ConversionPlan::Rewrite { staged, budgets, .. } => {
            assert!(staged.is_empty());
            assert_eq!(
                budgets,
                vec![StagedBudget {
                    id,
                    old_budget: Decimal::new(900, 0),
                    new_budget: Decimal::new(450, 0),
                }]
            );
        }
        other => panic!("unexpected plan {:?}", other),
    }
}

#[test]
fn failed_preference_write_leaves_a_resumable_checkpoint() {
    let conn = setup();
    let plain = SqliteStore::new(&conn);
    let a = add(&plain, TransactionType::Inflow, 1000);
    let rent = budgeted(&plain, "Rent", 400);
    let txns = plain.list_transactions().unwrap();
    let cats = plain.list_categories().unwrap();

    let flaky = FlakyStore {
        inner: SqliteStore::new(&conn),
        fail_ids: HashSet::new(),
        fail_currency: true,
    };
    let err = convert::change_currency(
        "USD",
        "EUR",
        &txns,
        &cats,
        &StaticRates::new(usd_eur()),
        "USD",
        &flaky,
    )
    .unwrap_err();
    let checkpoint = match err {
        ConversionError::PreferenceWriteFailure { checkpoint, .. } => checkpoint,
        other => panic!("unexpected error {:?}", other),
    };
    assert!(checkpoint.writes_done());
    assert_eq!(checkpoint.completed, vec![a]);
    assert_eq!(checkpoint.completed_budgets, vec![rent]);
    assert_eq!(plain.get_transaction(a).unwrap().amount, Decimal::new(500, 0));
    assert_eq!(plain.preferences().unwrap().currency, "USD");

    // Resuming only flips the preference; amounts are not converted again.
    let out = convert::resume(&checkpoint, &plain).unwrap();
    assert_eq!(out.currency, "EUR");
    assert_eq!(out.writes, 0);
    assert_eq!(plain.preferences().unwrap().currency, "EUR");
    assert_eq!(plain.get_transaction(a).unwrap().amount, Decimal::new(500, 0));
    let rent_budget = plain
        .list_categories()
        .unwrap()
        .into_iter()
        .find(|c| c.id == rent)
        .unwrap()
        .budget;
    assert_eq!(rent_budget, Some(Decimal::new(200, 0)));
}

#[test]
fn checkpoints_written_before_budgets_still_load() {
    let raw = r#"{"from":"USD","to":"EUR","factor":"0.5","completed":[1],"pending":[]}"#;
    let cp: convert::ConversionCheckpoint = serde_json::from_str(raw).unwrap();
    assert!(cp.writes_done());
    assert!(cp.pending_budgets.is_empty());
}

#[test]
fn conversion_stays_inside_the_active_scope() {
    let conn = setup();
    let local = SqliteStore::new(&conn);
    let anon = add(&local, TransactionType::Outflow, 100);
    let uid = local.create_user("Ana", "ana@example.com").unwrap();
    let ana = SqliteStore::sign_in(&conn, uid).unwrap();
    let ana_tx = add(&ana, TransactionType::Outflow, 100);

    // Signed in: only the user's rows and profile change.
    let txns = ana.list_transactions().unwrap();
    let cats = ana.list_categories().unwrap();
    convert::change_currency("USD", "EUR", &txns, &cats, &StaticRates::new(usd_eur()), "USD", &ana)
        .unwrap();
    SqliteStore::sign_out(&conn).unwrap();
    let local = SqliteStore::active(&conn).unwrap();
    assert_eq!(local.preferences().unwrap().currency, "USD");
    assert_eq!(local.get_transaction(anon).unwrap().amount, Decimal::new(100, 0));

    // Signed out: only the anonymous rows and settings change.
    let txns = local.list_transactions().unwrap();
    let cats = local.list_categories().unwrap();
    convert::change_currency("USD", "EUR", &txns, &cats, &StaticRates::new(usd_eur()), "USD", &local)
        .unwrap();
    assert_eq!(local.get_transaction(anon).unwrap().amount, Decimal::new(50, 0));

    let ana = SqliteStore::sign_in(&conn, uid).unwrap();
    assert_eq!(ana.preferences().unwrap().currency, "EUR");
    assert_eq!(ana.get_transaction(ana_tx).unwrap().amount, Decimal::new(50, 0));
}
