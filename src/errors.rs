// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::convert::ConversionCheckpoint;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid {field} '{value}' in {entity} {id}")]
    Corrupt {
        entity: &'static str,
        id: i64,
        field: &'static str,
        value: String,
    },

    #[error("category {0} is a default category and cannot be deleted")]
    ProtectedCategory(i64),

    #[error("category {category_id} is {category_kind}, transaction is {transaction_kind}")]
    CategoryMismatch {
        category_id: i64,
        category_kind: String,
        transaction_kind: String,
    },

    #[error("invalid amount {0}: amounts must not be negative")]
    NegativeAmount(Decimal),

    #[error("invalid amount {0}: exceeds {max}", max = crate::store::MAX_AMOUNT)]
    AmountOutOfRange(Decimal),
}

#[derive(Debug, Error)]
pub enum FxError {
    #[error("rate request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate source returned '{0}'")]
    Upstream(String),

    #[error("no cached rates for base {0}")]
    NoSnapshot(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for FxError {
    fn from(value: rusqlite::Error) -> Self {
        FxError::Store(StoreError::Sqlite(value))
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("cannot convert {from} to {to}: exchange rate unavailable ({reason})")]
    RateUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    #[error(
        "conversion {} -> {} stopped with {} failed write(s); ledger may hold mixed currencies until resumed",
        .checkpoint.from,
        .checkpoint.to,
        .failures.len()
    )]
    PartialWriteFailure {
        checkpoint: ConversionCheckpoint,
        failures: Vec<(i64, String)>,
    },

    #[error(
        "amounts converted {} -> {} but the currency preference was not saved ({reason}); resume to finish",
        .checkpoint.from,
        .checkpoint.to
    )]
    PreferenceWriteFailure {
        checkpoint: ConversionCheckpoint,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
