//! Food Emissions
//!
//! Finnish food consumption statistics, greenhouse-gas emission factors of
//! food products, and a weekly diet emissions calculator.
//!
//! - `fetch`: LUKE statistics API client (one synchronous POST)
//! - `consumption`: wide consumption table with filtering, long form and extremes
//! - `emissions`: reconciliation of the two emission-factor CSV files
//! - `diet`: per-session diet selection and weighted emission sums
//! - `data`: loads both datasets into one bundle
//! - `api_server`, `session`: Axum JSON API (feature `api`)

pub mod config;
pub mod consumption;
pub mod data;
pub mod diet;
pub mod emissions;
pub mod error;
pub mod fetch;
pub mod utils;

// API server modules
pub mod api_server;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use consumption::{CategoryExtremes, ConsumptionPoint, ConsumptionTable, Extreme, YearRange};
pub use data::FoodData;
pub use diet::{calculate, DietEmissions, DietEntry, DietSelection, FoodEmission};
pub use emissions::{reconcile, EmissionFactor, EmissionTable};
pub use error::{FetchError, FoodDataError};
pub use fetch::{ConsumptionSource, LukeClient, StaticSource};

#[cfg(feature = "api")]
pub use api_server::{AppState, AppError, create_router};
