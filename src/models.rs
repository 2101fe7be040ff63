// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::format::{DateFormat, NumberFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Inflow,
    Outflow,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Inflow => "inflow",
            TransactionType::Outflow => "outflow",
        }
    }

    /// Signed contribution of `amount` to a balance.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Inflow => amount,
            TransactionType::Outflow => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inflow" | "income" => Ok(TransactionType::Inflow),
            "outflow" | "expense" => Ok(TransactionType::Outflow),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
    Yearly,
}

impl FromStr for RecurringFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RecurringFrequency::Daily),
            "weekly" => Ok(RecurringFrequency::Weekly),
            "bi-weekly" | "biweekly" => Ok(RecurringFrequency::BiWeekly),
            "monthly" => Ok(RecurringFrequency::Monthly),
            "yearly" => Ok(RecurringFrequency::Yearly),
            other => Err(format!("unknown frequency '{}'", other)),
        }
    }
}

/// Metadata for a repeating obligation. Only the stored instance exists;
/// occurrences are never expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringConfig {
    pub frequency: RecurringFrequency,
    pub end_date: Option<DateTime<Utc>>,
    pub occurrences: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub r#type: TransactionType,
    /// Always denominated in the currently selected currency.
    pub amount: Decimal,
    pub category_id: Option<i64>,
    pub description: String,
    pub date: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurring_config: Option<RecurringConfig>,
    pub reminder_days: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.r#type.signed(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub category_id: Option<i64>,
    pub description: String,
    pub date: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurring_config: Option<RecurringConfig>,
    pub reminder_days: Option<u32>,
}

impl NewTransaction {
    pub fn new(r#type: TransactionType, amount: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            r#type,
            amount,
            category_id: None,
            description: String::new(),
            date,
            is_recurring: false,
            recurring_config: None,
            reminder_days: None,
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub r#type: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub category_id: Option<Option<i64>>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub recurring_config: Option<Option<RecurringConfig>>,
    pub reminder_days: Option<Option<u32>>,
}

impl TransactionPatch {
    pub fn amount(amount: Decimal) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub r#type: TransactionType,
    pub icon: String,
    pub color: String,
    pub budget: Option<Decimal>,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub r#type: TransactionType,
    pub icon: String,
    pub color: String,
    pub budget: Option<Decimal>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub budget: Option<Option<Decimal>>,
}

impl CategoryPatch {
    pub fn budget(budget: Decimal) -> Self {
        Self {
            budget: Some(Some(budget)),
            ..Self::default()
        }
    }
}

pub fn default_categories() -> Vec<NewCategory> {
    [
        ("Salary", TransactionType::Inflow, "cash", "#4CAF50"),
        ("Freelance", TransactionType::Inflow, "briefcase", "#8BC34A"),
        ("Food", TransactionType::Outflow, "fast-food", "#F44336"),
        ("Transport", TransactionType::Outflow, "car", "#FF9800"),
        ("Shopping", TransactionType::Outflow, "cart", "#E91E63"),
        ("Bills", TransactionType::Outflow, "receipt", "#9C27B0"),
        ("Entertainment", TransactionType::Outflow, "game-controller", "#673AB7"),
        ("Health", TransactionType::Outflow, "medkit", "#00BCD4"),
    ]
    .into_iter()
    .map(|(name, r#type, icon, color)| NewCategory {
        name: name.to_string(),
        r#type,
        icon: icon.to_string(),
        color: color.to_string(),
        budget: None,
        is_default: true,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// ISO code every stored amount is denominated in.
    pub currency: String,
    pub date_format: DateFormat,
    pub number_format: NumberFormat,
    pub is_onboarded: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            date_format: DateFormat::default(),
            number_format: NumberFormat::default(),
            is_onboarded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}
