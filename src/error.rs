//! Error types
//!
//! `FetchError` covers the statistics API call, `FoodDataError` covers
//! lookups and table operations on data that is already loaded.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Failure while fetching consumption statistics. No retry is attempted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("statistics API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("statistics API returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed record in statistics API response: {0}")]
    MalformedRecord(String),

    #[error("failed to build consumption table: {0}")]
    Table(#[from] FoodDataError),
}

/// Failure of a lookup or table operation on loaded data
#[derive(Debug, Error)]
pub enum FoodDataError {
    #[error("unknown food '{0}' (not in the emissions table)")]
    UnknownFood(String),

    #[error("unknown consumption category '{0}'")]
    UnknownCategory(String),

    #[error("invalid year range {start}..={end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("invalid weekly quantity {quantity} for '{food}' (must be finite and >= 0)")]
    InvalidQuantity { food: String, quantity: f64 },

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("table operation failed: {0}")]
    Frame(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
