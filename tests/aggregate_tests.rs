// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use purseline::aggregate::{
    self, BudgetHealth, SavingsThresholds, SavingsTier, TransactionFilter, OTHER_CATEGORY,
};
use purseline::models::{Category, Transaction, TransactionType};
use rust_decimal::Decimal;

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn tx(id: i64, kind: TransactionType, amount: i64, date: &str, category: Option<i64>) -> Transaction {
    Transaction {
        id,
        r#type: kind,
        amount: Decimal::new(amount, 0),
        category_id: category,
        description: format!("item {}", id),
        date: at(date),
        is_recurring: false,
        recurring_config: None,
        reminder_days: None,
        created_at: at(date),
        updated_at: at(date),
    }
}

fn cat(id: i64, name: &str, budget: Option<i64>) -> Category {
    Category {
        id,
        name: name.to_string(),
        r#type: TransactionType::Outflow,
        icon: "pricetag".to_string(),
        color: "#123456".to_string(),
        budget: budget.map(|b| Decimal::new(b, 0)),
        is_default: false,
    }
}

fn d(v: i64) -> Decimal {
    Decimal::new(v, 0)
}

#[test]
fn salary_and_rent_month() {
    use TransactionType::*;
    let txns = vec![
        tx(1, Inflow, 1000, "2025-03-01T09:00:00Z", None),
        tx(2, Outflow, 400, "2025-03-03T18:30:00Z", Some(1)),
    ];
    let cats = vec![cat(1, "Rent", None)];
    let now = at("2025-03-20T00:00:00Z");

    let dash = aggregate::dashboard(&txns, &cats, "2025-03", now, &SavingsThresholds::default());
    assert_eq!(dash.balance, d(600));
    assert_eq!(dash.budget.budget, d(1000));
    assert_eq!(dash.budget.available, d(600));
    assert_eq!(dash.budget.spent_pct, d(40));
    assert_eq!(dash.budget.available_pct, d(60));
    assert_eq!(dash.budget.health, BudgetHealth::Healthy);
    assert_eq!(dash.savings_rate, 60);
    assert_eq!(dash.savings_tier, SavingsTier::Excellent);
    assert_eq!(dash.trend.pct, 100);
    assert_eq!(dash.top_category.unwrap().name, "Rent");
    assert_eq!(dash.sparkline.len(), 20);
}

#[test]
fn overspending_is_clamped() {
    use TransactionType::*;
    let txns = vec![
        tx(1, Inflow, 1000, "2025-03-01T00:00:00Z", None),
        tx(2, Outflow, 1500, "2025-03-02T00:00:00Z", None),
    ];
    let totals = aggregate::monthly_totals(&txns, "2025-03");
    let b = aggregate::budget_summary(&totals);
    assert_eq!(b.available, d(-500));
    assert_eq!(b.spent_pct, d(100));
    assert_eq!(b.available_pct, d(0));
    assert_eq!(b.health, BudgetHealth::Critical);
    assert_eq!(aggregate::savings_rate(&totals), 0);
}

#[test]
fn no_income_means_zero_percentages() {
    let txns = vec![tx(1, TransactionType::Outflow, 75, "2025-03-05T00:00:00Z", None)];
    let totals = aggregate::monthly_totals(&txns, "2025-03");
    let b = aggregate::budget_summary(&totals);
    assert_eq!(b.spent_pct, Decimal::ZERO);
    assert_eq!(b.available_pct, Decimal::ZERO);
    assert_eq!(aggregate::savings_rate(&totals), 0);
}

#[test]
fn health_thresholds() {
    assert_eq!(aggregate::budget_health(d(24)), BudgetHealth::Critical);
    assert_eq!(aggregate::budget_health(d(25)), BudgetHealth::Warning);
    assert_eq!(aggregate::budget_health(d(49)), BudgetHealth::Warning);
    assert_eq!(aggregate::budget_health(d(50)), BudgetHealth::Healthy);
}

#[test]
fn trend_percentages() {
    assert_eq!(aggregate::trend_pct(d(110), d(100)), 10);
    assert_eq!(aggregate::trend_pct(d(50), d(100)), -50);
    assert_eq!(aggregate::trend_pct(d(5), d(0)), 100);
    assert_eq!(aggregate::trend_pct(d(-5), d(0)), 0);
    assert_eq!(aggregate::trend_pct(d(0), d(0)), 0);
    // Half steps round toward positive infinity.
    assert_eq!(aggregate::trend_pct(d(1005), d(1000)), 1);
    assert_eq!(aggregate::trend_pct(d(995), d(1000)), 0);
}

#[test]
fn trend_compares_against_previous_month_across_year_end() {
    use TransactionType::*;
    let txns = vec![
        tx(1, Inflow, 200, "2024-12-10T00:00:00Z", None),
        tx(2, Inflow, 300, "2025-01-10T00:00:00Z", None),
    ];
    let t = aggregate::trend(&txns, "2025-01");
    assert_eq!(t.previous, d(200));
    assert_eq!(t.current, d(300));
    assert_eq!(t.pct, 50);
}

#[test]
fn sparkline_tracks_running_difference() {
    use TransactionType::*;
    let txns = vec![
        tx(1, Inflow, 40, "2025-02-01T10:00:00Z", None),
        tx(2, Inflow, 100, "2025-03-02T10:00:00Z", None),
        tx(3, Outflow, 30, "2025-03-04T10:00:00Z", None),
    ];
    let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    let line = aggregate::trend_sparkline(&txns, "2025-03", today);
    assert_eq!(line, vec![d(-40), d(60), d(60), d(30), d(30)]);

    assert_eq!(aggregate::trend_sparkline(&txns, "2025-02", today).len(), 28);
    assert!(aggregate::trend_sparkline(&txns, "2025-04", today).is_empty());
}

#[test]
fn breakdown_ranks_and_collects_unknown_categories() {
    use TransactionType::*;
    let cats = vec![cat(1, "Food", Some(200)), cat(2, "Transport", None)];
    let txns = vec![
        tx(1, Outflow, 100, "2025-03-01T00:00:00Z", Some(1)),
        tx(2, Outflow, 50, "2025-03-02T00:00:00Z", Some(1)),
        tx(3, Outflow, 50, "2025-03-02T00:00:00Z", Some(2)),
        tx(4, Outflow, 30, "2025-03-03T00:00:00Z", Some(99)),
        tx(5, Outflow, 20, "2025-03-03T00:00:00Z", None),
        tx(6, Inflow, 900, "2025-03-03T00:00:00Z", None),
        tx(7, Outflow, 500, "2025-02-03T00:00:00Z", Some(2)),
    ];
    let b = aggregate::category_breakdown(&txns, &cats, "2025-03");
    let names: Vec<&str> = b.ranked.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Food", OTHER_CATEGORY, "Transport"]);
    assert_eq!(b.ranked[0].total, d(150));
    assert_eq!(b.ranked[0].budget_pct, Some(d(75)));
    assert_eq!(b.ranked[1].total, d(50));
    assert_eq!(b.ranked[1].category_id, None);
}

#[test]
fn donut_keeps_five_largest() {
    let cats: Vec<Category> = (1..=7).map(|i| cat(i, &format!("C{}", i), None)).collect();
    let txns: Vec<Transaction> = (1..=7)
        .map(|i| tx(i, TransactionType::Outflow, i * 10, "2025-03-15T00:00:00Z", Some(i)))
        .collect();
    let b = aggregate::category_breakdown(&txns, &cats, "2025-03");
    assert_eq!(b.ranked.len(), 7);
    assert_eq!(b.donut().len(), 5);
    assert_eq!(b.top().unwrap().name, "C7");
    assert_eq!(b.donut()[4].name, "C3");
}

#[test]
fn savings_tiers_use_configured_thresholds() {
    let t = SavingsThresholds::default();
    assert_eq!(t.tier(20), SavingsTier::Excellent);
    assert_eq!(t.tier(10), SavingsTier::Good);
    assert_eq!(t.tier(9), SavingsTier::Low);

    let strict = SavingsThresholds {
        good: 30,
        excellent: 50,
    };
    assert_eq!(strict.tier(20), SavingsTier::Low);
}

#[test]
fn filter_searches_description_and_category() {
    use TransactionType::*;
    let cats = vec![cat(1, "Groceries", None)];
    let mut coffee = tx(1, Outflow, 4, "2025-03-01T08:00:00Z", None);
    coffee.description = "Morning Coffee".into();
    let txns = vec![
        coffee,
        tx(2, Outflow, 60, "2025-03-02T08:00:00Z", Some(1)),
        tx(3, Inflow, 900, "2025-03-03T08:00:00Z", None),
    ];

    let f = TransactionFilter {
        search: Some("coffee".into()),
        ..TransactionFilter::default()
    };
    assert_eq!(f.apply(&txns, &cats).len(), 1);

    let f = TransactionFilter {
        search: Some("GROC".into()),
        ..TransactionFilter::default()
    };
    assert_eq!(f.apply(&txns, &cats)[0].id, 2);

    let f = TransactionFilter {
        kind: Some(Outflow),
        month: Some("2025-03".into()),
        search: None,
    };
    let ids: Vec<i64> = f.apply(&txns, &cats).iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn same_inputs_same_dashboard() {
    let txns = vec![tx(1, TransactionType::Inflow, 10, "2025-03-01T00:00:00Z", None)];
    let now = at("2025-03-02T00:00:00Z");
    let t = SavingsThresholds::default();
    assert_eq!(
        aggregate::dashboard(&txns, &[], "2025-03", now, &t),
        aggregate::dashboard(&txns, &[], "2025-03", now, &t)
    );
}

#[test]
fn recent_and_month_slices() {
    use TransactionType::*;
    let txns = vec![
        tx(1, Outflow, 5, "2025-02-27T00:00:00Z", None),
        tx(2, Outflow, 6, "2025-03-01T00:00:00Z", None),
        tx(3, Inflow, 7, "2025-03-01T00:00:00Z", None),
        tx(4, Outflow, 8, "2025-02-28T23:59:59Z", None),
    ];
    let ids: Vec<i64> = aggregate::recent(&txns, 3).iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![3, 2, 4]);

    let march: Vec<i64> = aggregate::transactions_in_month(&txns, "2025-03")
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(march, vec![2, 3]);
    assert_eq!(aggregate::balance(&txns), d(-12));
}

#[test]
fn extreme_amounts_saturate_instead_of_panicking() {
    use TransactionType::*;
    let huge = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
    let mut a = tx(1, Inflow, 0, "2025-03-01T00:00:00Z", None);
    a.amount = huge;
    let mut b = tx(2, Inflow, 0, "2025-03-02T00:00:00Z", None);
    b.amount = huge;
    let mut c = tx(3, Outflow, 0, "2025-03-03T00:00:00Z", Some(1));
    c.amount = huge;
    let mut e = tx(4, Outflow, 0, "2025-03-04T00:00:00Z", Some(1));
    e.amount = huge;
    let txns = vec![a, b, c, e];
    let cats = vec![cat(1, "Rent", Some(1))];
    let now = at("2025-03-05T00:00:00Z");

    let dash = aggregate::dashboard(&txns, &cats, "2025-03", now, &SavingsThresholds::default());
    assert_eq!(dash.totals.inflow, Decimal::MAX);
    assert_eq!(dash.totals.outflow, Decimal::MAX);
    assert_eq!(dash.budget.spent_pct, d(100));
    assert_eq!(dash.categories.ranked[0].total, Decimal::MAX);
    assert_eq!(dash.categories.ranked[0].budget_pct, Some(d(100)));
    assert_eq!(dash.sparkline.len(), 5);
    assert_eq!(dash.sparkline[1], Decimal::MAX);

    let t = aggregate::trend_pct(Decimal::MAX, Decimal::ONE);
    assert_eq!(t, i64::MAX);
}
