//! Data Loading
//!
//! Bundles the two datasets every view needs: the interpolated consumption
//! table (from the statistics API) and the merged emissions table (from the
//! two local CSV files).

use crate::config::Config;
use crate::consumption::ConsumptionTable;
use crate::emissions::EmissionTable;
use crate::fetch::{ConsumptionSource, LukeClient};
use anyhow::{Context, Result};
use std::path::Path;

/// Main data holder
#[derive(Debug, Clone)]
pub struct FoodData {
    /// kg/person/year, gaps interpolated
    pub consumption: ConsumptionTable,

    /// kg CO2-eq per kg, unique food names
    pub emissions: EmissionTable,
}

impl FoodData {
    /// Fetch consumption from the configured API and load emissions from
    /// `config.data_dir`
    pub fn load(config: &Config) -> Result<Self> {
        let client = LukeClient::new(config.luke_api_url.clone(), config.years);
        Self::load_with(&client, &config.data_dir)
    }

    /// Load using any consumption source
    pub fn load_with(source: &dyn ConsumptionSource, data_dir: &Path) -> Result<Self> {
        let consumption = source
            .fetch()
            .with_context(|| "Failed to fetch food consumption statistics")?;

        let emissions = EmissionTable::load(data_dir)
            .with_context(|| format!("Failed to load emission factors from {:?}", data_dir))?;

        tracing::info!("  Consumption: {} years x {} categories",
            consumption.height(), consumption.categories().len());
        tracing::info!("  Emissions: {} foods", emissions.len());

        Ok(FoodData {
            consumption,
            emissions,
        })
    }
}
