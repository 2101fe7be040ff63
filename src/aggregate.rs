// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Derived ledger metrics.
//!
//! Pure functions over a transaction slice and a `YYYY-MM` month. Every
//! screen goes through [`dashboard`] so that budget, trend and category
//! figures are computed once from the same inputs.
//!
//! Months are bucketed by the UTC calendar date of `Transaction::date`.
//! Sums and ratios saturate at the `Decimal` range instead of panicking.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Category, Transaction, TransactionType};
use crate::utils::{days_in_month, month_key, previous_month};

pub const OTHER_CATEGORY: &str = "Other";
const OTHER_COLOR: &str = "#666666";
const DONUT_SLICES: usize = 5;

fn hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn clamp_pct(v: Decimal) -> Decimal {
    v.max(Decimal::ZERO).min(hundred())
}

/// `part / whole * 100`, saturating instead of overflowing.
fn ratio_pct(part: Decimal, whole: Decimal) -> Decimal {
    match part.checked_div(whole) {
        Some(r) => r.saturating_mul(hundred()),
        None if part.is_sign_negative() != whole.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}

fn sum(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Rounds half toward positive infinity, like `Math.round`.
fn round_half_up(v: Decimal) -> i64 {
    let r = v.saturating_add(Decimal::new(5, 1)).floor();
    r.to_i64()
        .unwrap_or(if r.is_sign_negative() { i64::MIN } else { i64::MAX })
}

pub fn in_month(t: &Transaction, month: &str) -> bool {
    month_key(t.date) == month
}

pub fn transactions_in_month<'a>(txns: &'a [Transaction], month: &str) -> Vec<&'a Transaction> {
    txns.iter().filter(|t| in_month(t, month)).collect()
}

/// All-time signed sum: inflows add, outflows subtract.
pub fn balance(txns: &[Transaction]) -> Decimal {
    sum(txns.iter().map(Transaction::signed_amount))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyTotals {
    pub inflow: Decimal,
    pub outflow: Decimal,
}

impl MonthlyTotals {
    pub fn net(&self) -> Decimal {
        self.inflow.saturating_sub(self.outflow)
    }
}

pub fn monthly_totals(txns: &[Transaction], month: &str) -> MonthlyTotals {
    let mut totals = MonthlyTotals {
        inflow: Decimal::ZERO,
        outflow: Decimal::ZERO,
    };
    for t in transactions_in_month(txns, month) {
        match t.r#type {
            TransactionType::Inflow => totals.inflow = totals.inflow.saturating_add(t.amount),
            TransactionType::Outflow => totals.outflow = totals.outflow.saturating_add(t.amount),
        }
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetHealth {
    Critical,
    Warning,
    Healthy,
}

pub fn budget_health(available_pct: Decimal) -> BudgetHealth {
    if available_pct < Decimal::new(25, 0) {
        BudgetHealth::Critical
    } else if available_pct < Decimal::new(50, 0) {
        BudgetHealth::Warning
    } else {
        BudgetHealth::Healthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetSummary {
    /// This month's income; there is no separate budget setting.
    pub budget: Decimal,
    pub spent: Decimal,
    pub available: Decimal,
    pub spent_pct: Decimal,
    pub available_pct: Decimal,
    pub health: BudgetHealth,
}

pub fn budget_summary(totals: &MonthlyTotals) -> BudgetSummary {
    let budget = totals.inflow;
    let available = totals.net();
    let (spent_pct, available_pct) = if budget > Decimal::ZERO {
        (
            clamp_pct(ratio_pct(totals.outflow, budget)),
            clamp_pct(ratio_pct(available, budget)),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    BudgetSummary {
        budget,
        spent: totals.outflow,
        available,
        spent_pct,
        available_pct,
        health: budget_health(available_pct),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trend {
    pub current: Decimal,
    pub previous: Decimal,
    /// Month-over-month change of the net amount, in whole percent.
    pub pct: i64,
}

pub fn trend_pct(current: Decimal, previous: Decimal) -> i64 {
    if previous > Decimal::ZERO {
        round_half_up(ratio_pct(current.saturating_sub(previous), previous))
    } else if current > Decimal::ZERO {
        100
    } else {
        0
    }
}

pub fn trend(txns: &[Transaction], month: &str) -> Trend {
    let current = monthly_totals(txns, month).net();
    let previous = previous_month(month)
        .map(|p| monthly_totals(txns, &p).net())
        .unwrap_or(Decimal::ZERO);
    Trend {
        current,
        previous,
        pct: trend_pct(current, previous),
    }
}

/// Net of `month` counting only transactions on or before day `day`.
fn running_net(txns: &[Transaction], month: &str, day: u32) -> Decimal {
    sum(txns
        .iter()
        .filter(|t| in_month(t, month) && t.date.day() <= day)
        .map(Transaction::signed_amount))
}

fn sparkline_days(month: &str, today: NaiveDate) -> u32 {
    let this_month = today.format("%Y-%m").to_string();
    match month.cmp(this_month.as_str()) {
        std::cmp::Ordering::Equal => today.day(),
        std::cmp::Ordering::Less => days_in_month(month).unwrap_or(0),
        std::cmp::Ordering::Greater => 0,
    }
}

/// Day-by-day difference between this month's running net and last month's
/// running net at the same day index, from day 1 up to `today` (or the end
/// of `month` when it is already over).
pub fn trend_sparkline(txns: &[Transaction], month: &str, today: NaiveDate) -> Vec<Decimal> {
    let Some(prev) = previous_month(month) else {
        return Vec::new();
    };
    (1..=sparkline_days(month, today))
        .map(|day| running_net(txns, month, day).saturating_sub(running_net(txns, &prev, day)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// `None` for the pseudo-category collecting unresolved ids.
    pub category_id: Option<i64>,
    pub name: String,
    pub color: String,
    pub total: Decimal,
    pub budget: Option<Decimal>,
    pub budget_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    /// Every outflow category of the month, largest first.
    pub ranked: Vec<CategoryTotal>,
}

impl CategoryBreakdown {
    pub fn top(&self) -> Option<&CategoryTotal> {
        self.ranked.first()
    }

    pub fn donut(&self) -> &[CategoryTotal] {
        &self.ranked[..self.ranked.len().min(DONUT_SLICES)]
    }
}

pub fn category_breakdown(
    txns: &[Transaction],
    categories: &[Category],
    month: &str,
) -> CategoryBreakdown {
    let by_id: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let mut sums: HashMap<Option<i64>, Decimal> = HashMap::new();
    for t in transactions_in_month(txns, month)
        .into_iter()
        .filter(|t| t.r#type == TransactionType::Outflow)
    {
        let key = t.category_id.filter(|id| by_id.contains_key(id));
        let total = sums.entry(key).or_insert(Decimal::ZERO);
        *total = total.saturating_add(t.amount);
    }

    let mut ranked: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(key, total)| match key.and_then(|id| by_id.get(&id)) {
            Some(c) => CategoryTotal {
                category_id: Some(c.id),
                name: c.name.clone(),
                color: c.color.clone(),
                total,
                budget: c.budget,
                budget_pct: c
                    .budget
                    .filter(|b| *b > Decimal::ZERO)
                    .map(|b| clamp_pct(ratio_pct(total, b))),
            },
            None => CategoryTotal {
                category_id: None,
                name: OTHER_CATEGORY.to_string(),
                color: OTHER_COLOR.to_string(),
                total,
                budget: None,
                budget_pct: None,
            },
        })
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    CategoryBreakdown { ranked }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsThresholds {
    pub good: i64,
    pub excellent: i64,
}

impl Default for SavingsThresholds {
    fn default() -> Self {
        Self {
            good: 10,
            excellent: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SavingsTier {
    Low,
    Good,
    Excellent,
}

impl SavingsThresholds {
    pub fn tier(&self, rate: i64) -> SavingsTier {
        if rate >= self.excellent {
            SavingsTier::Excellent
        } else if rate >= self.good {
            SavingsTier::Good
        } else {
            SavingsTier::Low
        }
    }
}

/// Share of income kept this month, in whole percent. Floored at 0, not capped.
pub fn savings_rate(totals: &MonthlyTotals) -> i64 {
    if totals.inflow > Decimal::ZERO {
        round_half_up(ratio_pct(totals.net(), totals.inflow)).max(0)
    } else {
        0
    }
}

/// Newest first by transaction date.
pub fn recent(txns: &[Transaction], n: usize) -> Vec<&Transaction> {
    let mut out: Vec<&Transaction> = txns.iter().collect();
    out.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    out.truncate(n);
    out
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub month: Option<String>,
    pub search: Option<String>,
}

impl TransactionFilter {
    /// Search matches the description or the category name, case-insensitively.
    pub fn apply<'a>(
        &self,
        txns: &'a [Transaction],
        categories: &[Category],
    ) -> Vec<&'a Transaction> {
        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let mut out: Vec<&Transaction> = txns
            .iter()
            .filter(|t| self.kind.is_none_or(|k| t.r#type == k))
            .filter(|t| self.month.as_deref().is_none_or(|m| in_month(t, m)))
            .filter(|t| match &needle {
                None => true,
                Some(n) => {
                    t.description.to_lowercase().contains(n)
                        || category_name(categories, t.category_id)
                            .to_lowercase()
                            .contains(n)
                }
            })
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        out
    }
}

pub fn category_name(categories: &[Category], id: Option<i64>) -> &str {
    id.and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.name.as_str())
        .unwrap_or(OTHER_CATEGORY)
}

/// Groups already-sorted transactions by UTC calendar day, keeping order.
pub fn group_by_day<'a>(txns: &[&'a Transaction]) -> Vec<(NaiveDate, Vec<&'a Transaction>)> {
    let mut groups: Vec<(NaiveDate, Vec<&'a Transaction>)> = Vec::new();
    for &t in txns {
        let day = t.date.date_naive();
        match groups.last_mut() {
            Some((d, items)) if *d == day => items.push(t),
            _ => groups.push((day, vec![t])),
        }
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub month: String,
    pub balance: Decimal,
    pub totals: MonthlyTotals,
    pub budget: BudgetSummary,
    pub trend: Trend,
    pub sparkline: Vec<Decimal>,
    pub categories: CategoryBreakdown,
    pub top_category: Option<CategoryTotal>,
    pub savings_rate: i64,
    pub savings_tier: SavingsTier,
}

pub fn dashboard(
    txns: &[Transaction],
    categories: &[Category],
    month: &str,
    now: DateTime<Utc>,
    thresholds: &SavingsThresholds,
) -> Dashboard {
    let totals = monthly_totals(txns, month);
    let breakdown = category_breakdown(txns, categories, month);
    let rate = savings_rate(&totals);
    Dashboard {
        month: month.to_string(),
        balance: balance(txns),
        totals,
        budget: budget_summary(&totals),
        trend: trend(txns, month),
        sparkline: trend_sparkline(txns, month, now.date_naive()),
        top_category: breakdown.top().cloned(),
        categories: breakdown,
        savings_rate: rate,
        savings_tier: thresholds.tier(rate),
    }
}
