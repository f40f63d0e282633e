//! Utility modules shared by the consumption and emissions tables
//!
//! - Interpolation: linear gap filling on the year axis
//! - Rounding: fixed-precision rounding for emission factors
//! - LazyFrame helpers: column projection with validation

pub mod interpolation;
pub mod lazy_helpers;
pub mod rounding;

pub use interpolation::interpolate_linear;
pub use lazy_helpers::materialize_with_columns;
pub use rounding::round_to;
