//! LazyFrame materialization helpers with column validation
//!
//! Provides an explicit pattern for projecting Polars frames so
//! a missing column surfaces as an error naming it.

use polars::prelude::*;
use anyhow::{Context, Result, anyhow};
use rustc_hash::FxHashSet;

/// Materialize LazyFrame with explicit column list and validation
///
/// # Arguments
/// * `lazy` - LazyFrame to materialize
/// * `columns` - Required column names, in output order
/// * `context` - Context for error messages (e.g., "consumption subset")
///
/// # Errors
/// Returns error if materialization fails or a required column is absent
/// from the result.
pub fn materialize_with_columns(
    lazy: &LazyFrame,
    columns: &[&str],
    context: &str,
) -> Result<DataFrame> {
    let col_exprs: Vec<Expr> = columns.iter()
        .map(|&name| col(name))
        .collect();

    let df = lazy
        .clone()
        .select(&col_exprs)
        .collect()
        .with_context(|| format!("{}: Failed to materialize columns {:?}", context, columns))?;

    let actual_cols: FxHashSet<String> = df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    for &expected in columns {
        if !actual_cols.contains(expected) {
            return Err(anyhow!(
                "{}: Missing expected column '{}'. Available columns: {:?}",
                context, expected, actual_cols
            ));
        }
    }

    Ok(df)
}
