// Pipeline Tests
//
// Purpose: Load both datasets from fixtures through the public API and check
// the properties the dashboard views rely on.
// Run with: cargo test --test pipeline_tests

use approx::assert_relative_eq;
use food_emissions::diet::WEEKS_PER_YEAR;
use food_emissions::fetch::{parse_response, FOOD_CATEGORIES};
use food_emissions::{calculate, DietSelection, EmissionTable, FoodData, StaticSource};
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture_data() -> FoodData {
    let body = std::fs::read_to_string(fixtures_dir().join("luke_consumption_response.json"))
        .expect("Failed to read response fixture");
    let table = parse_response(&body, &FOOD_CATEGORIES)
        .expect("Failed to parse response fixture")
        .interpolated()
        .expect("Failed to interpolate");
    FoodData::load_with(&StaticSource(table), &fixtures_dir()).expect("Failed to load fixtures")
}

#[test]
fn test_consumption_has_no_gaps_after_interpolation() {
    let data = load_fixture_data();
    let long = data.consumption.long_records().unwrap();

    // 3 categories x 4 years, every cell filled
    assert_eq!(long.len(), 12);

    let milk_2020 = long
        .iter()
        .find(|p| p.food == "Milk" && p.year == 2020)
        .unwrap();
    assert_relative_eq!(milk_2020.consumption, 99.7, epsilon = 1e-9);

    let eggs_2022 = long
        .iter()
        .find(|p| p.food == "Eggs" && p.year == 2022)
        .unwrap();
    assert_relative_eq!(eggs_2022.consumption, 13.0, epsilon = 1e-9);
}

#[test]
fn test_emission_names_unique_and_sorted() {
    let data = load_fixture_data();
    let foods = data.emissions.foods();

    let mut sorted = foods.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, foods);
}

#[test]
fn test_primary_source_wins() {
    let emissions = EmissionTable::load(&fixtures_dir()).unwrap();

    assert_eq!(emissions.get("Beef (beef herd)"), Some(99.48));
    assert_eq!(emissions.get("Apples"), Some(0.43));
    // Supplementary-only foods fill the gaps
    assert_eq!(emissions.get("Beef (dairy herd)"), Some(33.3));
    // Empty value dropped
    assert!(!emissions.contains("Olive Oil"));
}

#[test]
fn test_annual_is_52_weeks() {
    let data = load_fixture_data();
    let mut selection = DietSelection::new();
    selection.set_quantity("Beef (beef herd)", 0.25).unwrap();
    selection.set_quantity("Rice", 0.5).unwrap();

    let result = calculate(&selection, &data.emissions).unwrap();

    assert_relative_eq!(result.total_weekly_kg_co2, 0.25 * 99.48 + 0.5 * 4.45, epsilon = 1e-9);
    assert_eq!(result.total_annual_kg_co2, result.total_weekly_kg_co2 * WEEKS_PER_YEAR);
}
