// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Currency re-denomination.
//!
//! Stored amounts carry no currency tag: they are all in the currency held
//! by the preference store. Switching currency therefore rewrites every
//! amount. The work is split in two phases:
//!
//! 1. [`plan_conversion`] is pure. It computes the factor and the absolute
//!    target amount of every transaction and every category budget.
//! 2. [`commit`] writes the targets one record at a time and flips the
//!    currency preference only after every write succeeded. When some
//!    writes fail, or the preference write itself fails, the returned
//!    [`ConversionCheckpoint`] lists the ids that are done and the targets
//!    still pending, and [`resume`] finishes the job without converting
//!    anything twice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::errors::ConversionError;
use crate::fx::{RateSnapshot, RateSource};
use crate::models::{Category, CategoryPatch, Transaction, TransactionPatch};
use crate::store::{PreferenceStore, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedAmount {
    pub id: i64,
    pub old_amount: Decimal,
    pub new_amount: Decimal,
}

/// Budget ceiling of one category, before and after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedBudget {
    pub id: i64,
    pub old_budget: Decimal,
    pub new_budget: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionPlan {
    /// Old and new codes are the same; nothing is written.
    Unchanged { currency: String },
    /// Nothing denominated in money and no usable rates: only the
    /// preference changes.
    PreferenceOnly { from: String, to: String },
    Rewrite {
        from: String,
        to: String,
        factor: Decimal,
        staged: Vec<StagedAmount>,
        budgets: Vec<StagedBudget>,
        transactions: Vec<Transaction>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionCheckpoint {
    pub from: String,
    pub to: String,
    pub factor: Decimal,
    pub completed: Vec<i64>,
    pub pending: Vec<StagedAmount>,
    #[serde(default)]
    pub completed_budgets: Vec<i64>,
    #[serde(default)]
    pub pending_budgets: Vec<StagedBudget>,
}

impl ConversionCheckpoint {
    /// True when only the currency preference is left to write.
    pub fn writes_done(&self) -> bool {
        self.pending.is_empty() && self.pending_budgets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub currency: String,
    /// `None` when no amount had to be rewritten.
    pub factor: Option<Decimal>,
    pub transactions: Vec<Transaction>,
    /// Transaction amounts and category budgets written.
    pub writes: usize,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Phase 1: decide what a switch from `old` to `new` has to write.
pub fn plan_conversion(
    old: &str,
    new: &str,
    snapshot: Option<&RateSnapshot>,
    transactions: &[Transaction],
    categories: &[Category],
) -> Result<ConversionPlan, ConversionError> {
    let from = normalize_code(old);
    let to = normalize_code(new);
    if from == to {
        return Ok(ConversionPlan::Unchanged { currency: from });
    }

    let factor = match snapshot {
        None => Err("rate snapshot unavailable".to_string()),
        Some(s) => match (s.rate(&from), s.rate(&to)) {
            (Some(_), Some(_)) => s
                .cross_rate(&from, &to)
                .ok_or_else(|| format!("rate for {} overflows", to)),
            (None, _) => Err(format!("no rate for {}", from)),
            (_, None) => Err(format!("no rate for {}", to)),
        },
    };

    let budgeted = categories.iter().any(|c| c.budget.is_some());
    let factor = match factor {
        Ok(f) => f,
        Err(reason) if transactions.is_empty() && !budgeted => {
            debug!(%from, %to, %reason, "nothing to convert, switching without rates");
            return Ok(ConversionPlan::PreferenceOnly { from, to });
        }
        Err(reason) => {
            warn!(%from, %to, %reason, "refusing currency switch without rates");
            return Err(ConversionError::RateUnavailable { from, to, reason });
        }
    };
    let overflow = |what: &str, id: i64| ConversionError::RateUnavailable {
        from: from.clone(),
        to: to.clone(),
        reason: format!("converted {} {} overflows", what, id),
    };

    let mut seen = HashSet::with_capacity(transactions.len());
    let mut staged = Vec::with_capacity(transactions.len());
    let mut converted = Vec::with_capacity(transactions.len());
    for t in transactions {
        if !seen.insert(t.id) {
            debug!(id = t.id, "duplicate transaction id skipped");
            continue;
        }
        let new_amount = t
            .amount
            .checked_mul(factor)
            .ok_or_else(|| overflow("transaction", t.id))?;
        staged.push(StagedAmount {
            id: t.id,
            old_amount: t.amount,
            new_amount,
        });
        converted.push(Transaction {
            amount: new_amount,
            ..t.clone()
        });
    }

    let mut seen = HashSet::with_capacity(categories.len());
    let mut budgets = Vec::new();
    for c in categories {
        let Some(old_budget) = c.budget else { continue };
        if !seen.insert(c.id) {
            continue;
        }
        let new_budget = old_budget
            .checked_mul(factor)
            .ok_or_else(|| overflow("budget of category", c.id))?;
        budgets.push(StagedBudget {
            id: c.id,
            old_budget,
            new_budget,
        });
    }

    info!(
        %from,
        %to,
        %factor,
        count = staged.len(),
        budgets = budgets.len(),
        "conversion planned"
    );
    Ok(ConversionPlan::Rewrite {
        from,
        to,
        factor,
        staged,
        budgets,
        transactions: converted,
    })
}

struct WriteReport {
    completed: Vec<i64>,
    pending: Vec<StagedAmount>,
    completed_budgets: Vec<i64>,
    pending_budgets: Vec<StagedBudget>,
    failures: Vec<(i64, String)>,
}

impl WriteReport {
    fn writes(&self) -> usize {
        self.completed.len() + self.completed_budgets.len()
    }
}

fn write_all<S: RecordStore>(
    store: &S,
    staged: &[StagedAmount],
    budgets: &[StagedBudget],
) -> WriteReport {
    let mut report = WriteReport {
        completed: Vec::with_capacity(staged.len()),
        pending: Vec::new(),
        completed_budgets: Vec::with_capacity(budgets.len()),
        pending_budgets: Vec::new(),
        failures: Vec::new(),
    };
    for s in staged {
        match store.update_transaction(s.id, &TransactionPatch::amount(s.new_amount)) {
            Ok(()) => report.completed.push(s.id),
            Err(e) => {
                warn!(id = s.id, error = %e, "amount write failed");
                report.failures.push((s.id, e.to_string()));
                report.pending.push(s.clone());
            }
        }
    }
    for b in budgets {
        match store.update_category(b.id, &CategoryPatch::budget(b.new_budget)) {
            Ok(()) => report.completed_budgets.push(b.id),
            Err(e) => {
                warn!(category_id = b.id, error = %e, "budget write failed");
                report.failures.push((b.id, e.to_string()));
                report.pending_budgets.push(b.clone());
            }
        }
    }
    report
}

/// Writes the preference, turning a failure into a checkpoint that has
/// nothing left to rewrite.
fn switch_preference<S: PreferenceStore>(
    store: &S,
    checkpoint: ConversionCheckpoint,
) -> Result<ConversionCheckpoint, ConversionError> {
    match store.set_currency(&checkpoint.to) {
        Ok(()) => Ok(checkpoint),
        Err(e) => {
            error!(
                from = %checkpoint.from,
                to = %checkpoint.to,
                error = %e,
                "amounts converted but currency preference not written"
            );
            Err(ConversionError::PreferenceWriteFailure {
                checkpoint,
                reason: e.to_string(),
            })
        }
    }
}

/// Phase 2: persist a plan. The currency preference is written last.
pub fn commit<S>(plan: ConversionPlan, store: &S) -> Result<ConversionOutcome, ConversionError>
where
    S: RecordStore + PreferenceStore,
{
    match plan {
        ConversionPlan::Unchanged { currency } => Ok(ConversionOutcome {
            currency,
            factor: None,
            transactions: Vec::new(),
            writes: 0,
        }),
        ConversionPlan::PreferenceOnly { from, to } => {
            store.set_currency(&to)?;
            info!(%from, %to, "currency switched with nothing to convert");
            Ok(ConversionOutcome {
                currency: to,
                factor: None,
                transactions: Vec::new(),
                writes: 0,
            })
        }
        ConversionPlan::Rewrite {
            from,
            to,
            factor,
            staged,
            budgets,
            transactions,
        } => {
            let report = write_all(store, &staged, &budgets);
            let writes = report.writes();
            let checkpoint = ConversionCheckpoint {
                from,
                to,
                factor,
                completed: report.completed,
                pending: report.pending,
                completed_budgets: report.completed_budgets,
                pending_budgets: report.pending_budgets,
            };
            if !report.failures.is_empty() {
                error!(
                    from = %checkpoint.from,
                    to = %checkpoint.to,
                    failed = report.failures.len(),
                    completed = writes,
                    "partial conversion, currency preference left unchanged"
                );
                return Err(ConversionError::PartialWriteFailure {
                    checkpoint,
                    failures: report.failures,
                });
            }
            let checkpoint = switch_preference(store, checkpoint)?;
            info!(from = %checkpoint.from, to = %checkpoint.to, writes, "currency converted");
            Ok(ConversionOutcome {
                currency: checkpoint.to,
                factor: Some(factor),
                transactions,
                writes,
            })
        }
    }
}

/// Retries the pending writes of a failed commit, then the preference.
pub fn resume<S>(
    checkpoint: &ConversionCheckpoint,
    store: &S,
) -> Result<ConversionOutcome, ConversionError>
where
    S: RecordStore + PreferenceStore,
{
    let report = write_all(store, &checkpoint.pending, &checkpoint.pending_budgets);
    let writes = report.writes();
    let mut completed = checkpoint.completed.clone();
    completed.extend(report.completed.iter().copied());
    let mut completed_budgets = checkpoint.completed_budgets.clone();
    completed_budgets.extend(report.completed_budgets.iter().copied());
    let next = ConversionCheckpoint {
        from: checkpoint.from.clone(),
        to: checkpoint.to.clone(),
        factor: checkpoint.factor,
        completed,
        pending: report.pending,
        completed_budgets,
        pending_budgets: report.pending_budgets,
    };

    if !report.failures.is_empty() {
        return Err(ConversionError::PartialWriteFailure {
            checkpoint: next,
            failures: report.failures,
        });
    }

    let next = switch_preference(store, next)?;
    info!(
        from = %next.from,
        to = %next.to,
        writes,
        "resumed conversion completed"
    );
    Ok(ConversionOutcome {
        currency: next.to,
        factor: Some(next.factor),
        transactions: store.list_transactions()?,
        writes,
    })
}

/// Fetch rates, plan and commit a currency switch.
///
/// A failing rate source is not an error by itself: it only becomes one
/// when there are amounts or budgets to convert.
pub fn change_currency<R, S>(
    old: &str,
    new: &str,
    transactions: &[Transaction],
    categories: &[Category],
    rates: &R,
    base: &str,
    store: &S,
) -> Result<ConversionOutcome, ConversionError>
where
    R: RateSource + ?Sized,
    S: RecordStore + PreferenceStore,
{
    if normalize_code(old) == normalize_code(new) {
        return Ok(ConversionOutcome {
            currency: normalize_code(old),
            factor: None,
            transactions: transactions.to_vec(),
            writes: 0,
        });
    }

    let snapshot = match rates.snapshot(base) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "exchange rates unavailable");
            None
        }
    };
    let plan = plan_conversion(old, new, snapshot.as_ref(), transactions, categories)?;
    commit(plan, store)
}
