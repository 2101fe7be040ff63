// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Display formatting for money and dates.
//!
//! Everything here is a pure function of its arguments: the caller passes
//! the active currency and presets explicitly instead of reading them from
//! shared state.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberFormat {
    #[default]
    #[serde(rename = "1,234.56")]
    CommaDot,
    #[serde(rename = "1.234,56")]
    DotComma,
    #[serde(rename = "1 234.56")]
    SpaceDot,
    #[serde(rename = "1'234.56")]
    ApostropheDot,
}

impl NumberFormat {
    pub const ALL: [NumberFormat; 4] = [
        NumberFormat::CommaDot,
        NumberFormat::DotComma,
        NumberFormat::SpaceDot,
        NumberFormat::ApostropheDot,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NumberFormat::CommaDot => "1,234.56",
            NumberFormat::DotComma => "1.234,56",
            NumberFormat::SpaceDot => "1 234.56",
            NumberFormat::ApostropheDot => "1'234.56",
        }
    }

    pub fn decimal_separator(self) -> char {
        match self {
            NumberFormat::DotComma => ',',
            _ => '.',
        }
    }

    pub fn thousands_separator(self) -> char {
        match self {
            NumberFormat::CommaDot => ',',
            NumberFormat::DotComma => '.',
            NumberFormat::SpaceDot => ' ',
            NumberFormat::ApostropheDot => '\'',
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NumberFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumberFormat::ALL
            .into_iter()
            .find(|f| f.label() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown number format '{}', expected one of: {}",
                    s,
                    NumberFormat::ALL.map(|f| f.label()).join(" | ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "dd/MM/yyyy")]
    DaySlash,
    #[serde(rename = "MM/dd/yyyy")]
    MonthSlash,
    #[serde(rename = "yyyy/MM/dd")]
    YearSlash,
    #[serde(rename = "dd-MM-yyyy")]
    DayDash,
    #[serde(rename = "MM-dd-yyyy")]
    MonthDash,
    #[serde(rename = "yyyy-MM-dd")]
    Iso,
    #[serde(rename = "dd MMM yyyy")]
    DayMonthName,
    #[serde(rename = "MMM dd, yyyy")]
    MonthNameDay,
}

impl DateFormat {
    pub const ALL: [DateFormat; 8] = [
        DateFormat::DaySlash,
        DateFormat::MonthSlash,
        DateFormat::YearSlash,
        DateFormat::DayDash,
        DateFormat::MonthDash,
        DateFormat::Iso,
        DateFormat::DayMonthName,
        DateFormat::MonthNameDay,
    ];

    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::DaySlash => "dd/MM/yyyy",
            DateFormat::MonthSlash => "MM/dd/yyyy",
            DateFormat::YearSlash => "yyyy/MM/dd",
            DateFormat::DayDash => "dd-MM-yyyy",
            DateFormat::MonthDash => "MM-dd-yyyy",
            DateFormat::Iso => "yyyy-MM-dd",
            DateFormat::DayMonthName => "dd MMM yyyy",
            DateFormat::MonthNameDay => "MMM dd, yyyy",
        }
    }

    fn strftime(self) -> &'static str {
        match self {
            DateFormat::DaySlash => "%d/%m/%Y",
            DateFormat::MonthSlash => "%m/%d/%Y",
            DateFormat::YearSlash => "%Y/%m/%d",
            DateFormat::DayDash => "%d-%m-%Y",
            DateFormat::MonthDash => "%m-%d-%Y",
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::DayMonthName => "%d %b %Y",
            DateFormat::MonthNameDay => "%b %d, %Y",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateFormat::ALL
            .into_iter()
            .find(|f| f.pattern() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown date format '{}', expected one of: {}",
                    s,
                    DateFormat::ALL.map(|f| f.pattern()).join(" | ")
                )
            })
    }
}

pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

/// Currencies offered by the picker. Their symbols win over the generic table.
pub const CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo { code: "USD", name: "US Dollar", symbol: "$" },
    CurrencyInfo { code: "EUR", name: "Euro", symbol: "€" },
    CurrencyInfo { code: "GBP", name: "British Pound", symbol: "£" },
    CurrencyInfo { code: "JPY", name: "Japanese Yen", symbol: "¥" },
    CurrencyInfo { code: "CNY", name: "Chinese Yuan", symbol: "¥" },
    CurrencyInfo { code: "INR", name: "Indian Rupee", symbol: "₹" },
    CurrencyInfo { code: "CAD", name: "Canadian Dollar", symbol: "$" },
    CurrencyInfo { code: "AUD", name: "Australian Dollar", symbol: "$" },
    CurrencyInfo { code: "CHF", name: "Swiss Franc", symbol: "Fr" },
    CurrencyInfo { code: "LBP", name: "Lebanese Pound", symbol: "L.L." },
];

static ISO_SYMBOLS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("AED", "د.إ"),
        ("ARS", "$"),
        ("BRL", "R$"),
        ("CLP", "$"),
        ("CZK", "Kč"),
        ("DKK", "kr"),
        ("EGP", "£"),
        ("HKD", "$"),
        ("HUF", "Ft"),
        ("IDR", "Rp"),
        ("ILS", "₪"),
        ("JOD", "د.ا"),
        ("KRW", "₩"),
        ("KWD", "د.ك"),
        ("MAD", "د.م."),
        ("MXN", "$"),
        ("MYR", "RM"),
        ("NGN", "₦"),
        ("NOK", "kr"),
        ("NZD", "$"),
        ("PHP", "₱"),
        ("PKR", "₨"),
        ("PLN", "zł"),
        ("QAR", "ر.ق"),
        ("RUB", "₽"),
        ("SAR", "ر.س"),
        ("SEK", "kr"),
        ("SGD", "$"),
        ("THB", "฿"),
        ("TRY", "₺"),
        ("TWD", "NT$"),
        ("UAH", "₴"),
        ("VND", "₫"),
        ("ZAR", "R"),
        // Shared with the picker table, which takes precedence.
        ("EUR", "€"),
        ("GBP", "£"),
        ("JPY", "¥"),
        ("CNY", "元"),
        ("LBP", "ل.ل"),
        ("USD", "$"),
    ])
});

/// Display symbol for a currency code; unknown codes render as the code itself.
pub fn currency_symbol(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return "$".to_string();
    }
    let upper = code.to_ascii_uppercase();
    if let Some(c) = CURRENCIES.iter().find(|c| c.code == upper) {
        return c.symbol.to_string();
    }
    if let Some(s) = ISO_SYMBOLS.get(upper.as_str()) {
        return (*s).to_string();
    }
    upper
}

/// Renders `amount` as `[-]<symbol><grouped integer><sep><2 decimals>`.
pub fn format_money(amount: Decimal, currency: &str, number_format: NumberFormat) -> String {
    let (negative, body) = render(amount, number_format);
    let sign = if negative { "-" } else { "" };
    format!("{}{}{}", sign, currency_symbol(currency), body)
}

/// Two-decimal rendering with the preset's separators.
pub fn format_number(amount: Decimal, number_format: NumberFormat) -> String {
    let (negative, body) = render(amount, number_format);
    if negative { format!("-{}", body) } else { body }
}

/// Rounds once, half away from zero, and returns the sign of the rounded
/// value with its unsigned grouped digits.
fn render(amount: Decimal, number_format: NumberFormat) -> (bool, String) {
    let fixed = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = fixed.is_sign_negative() && !fixed.is_zero();
    let text = format!("{:.2}", fixed.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(number_format.thousands_separator());
        }
        grouped.push(*ch);
    }
    grouped.push(number_format.decimal_separator());
    grouped.push_str(frac_part);
    (negative, grouped)
}

pub fn format_date(date: DateTime<Utc>, date_format: DateFormat) -> String {
    date.format(date_format.strftime()).to_string()
}
