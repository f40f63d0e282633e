//! Print a text summary of consumption and emission data
//!
//! Fetches the consumption table (or reads a saved API response), loads the
//! emission factors from `DATA_DIR`, and prints the same figures the
//! dashboard views show.
//!
//! Usage:
//!   cargo run --bin food_report
//!   cargo run --bin food_report -- saved_response.json

use food_emissions::fetch::{parse_response, FOOD_CATEGORIES};
use food_emissions::{Config, ConsumptionSource, FetchError, FoodData, LukeClient, StaticSource};
use food_emissions::emissions::REFERENCE_POINTS;
use anyhow::Context;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "food_emissions=info,warn".into()),
        )
        .init();

    let config = Config::from_env()?;
    let saved_response = std::env::args().nth(1);

    println!("\n{}", "=".repeat(70));
    println!("Finnish Food Consumption & Food Emissions");
    println!("{}", "=".repeat(70));

    let start = Instant::now();
    let source: Box<dyn ConsumptionSource> = match saved_response {
        Some(path) => {
            println!("Consumption source: {}", path);
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read saved response: {}", path))?;
            let table = parse_response(&body, &FOOD_CATEGORIES)
                .and_then(|t| t.interpolated().map_err(FetchError::from))?;
            Box::new(StaticSource(table))
        }
        None => {
            println!("Consumption source: {}", config.luke_api_url);
            Box::new(LukeClient::new(config.luke_api_url.clone(), config.years))
        }
    };

    let data = FoodData::load_with(source.as_ref(), &config.data_dir)?;
    println!("Loaded in {:.2?}", start.elapsed());

    // Consumption: default categories over the full range
    let consumption = &data.consumption;
    let defaults = consumption.default_categories();
    if let Some(years) = consumption.year_bounds()? {
        println!("\nConsumption {}-{} (kg/person/year)", years.start, years.end);
        println!("{}", "-".repeat(70));
        let selected = consumption.select_categories(&defaults)?;
        for extremes in selected.extremes()? {
            match (extremes.lowest, extremes.highest) {
                (Some(low), Some(high)) => println!(
                    "  {:<20} lowest {:>7.1} kg ({})   highest {:>7.1} kg ({})",
                    extremes.food, low.value, low.year, high.value, high.year
                ),
                _ => println!("  {:<20} no data", extremes.food),
            }
        }
    } else {
        println!("\nConsumption table is empty");
    }

    // Emissions: default foods, highest first
    let emissions = &data.emissions;
    println!("\nEmission factors (kg CO2-eq per kg), {} foods", emissions.len());
    println!("{}", "-".repeat(70));
    let mut selected = emissions.select(&emissions.default_foods());
    selected.sort_by(|a, b| b.ghg_emission.total_cmp(&a.ghg_emission));
    for factor in &selected {
        println!("  {:<30} {:>8.2}", factor.food, factor.ghg_emission);
    }
    if let Some(domain) = emissions.domain() {
        println!("  Range over all foods: {:.2} - {:.2}", domain.min, domain.max);
    }

    println!("\nReference points");
    println!("{}", "-".repeat(70));
    for point in &REFERENCE_POINTS {
        if point.low_kg_co2 == point.high_kg_co2 {
            println!("  {:<40} ~{} kg CO2-eq", point.activity, point.low_kg_co2);
        } else {
            println!("  {:<40} ~{}-{} kg CO2-eq", point.activity, point.low_kg_co2, point.high_kg_co2);
        }
    }
    println!();

    Ok(())
}
