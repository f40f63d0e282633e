//! Food emission factors
//!
//! Two CSV sources (Our World in Data exports) describe kg CO2-eq per kg of
//! food. The primary file is authoritative; the supplementary file only
//! contributes foods the primary one lacks. The merged table has unique food
//! names, values rounded to 2 decimals, and is sorted by name.

use crate::error::FoodDataError;
use crate::utils::round_to;
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PRIMARY_FILE: &str = "greenhouse-gas-emissions-per-kilogram-of-food.csv";
pub const SUPPLEMENTARY_FILE: &str = "greenhouse-gas-emissions-per-kilogram-of-food-product.csv";

pub const ENTITY_COLUMN: &str = "Entity";
pub const PRIMARY_VALUE_COLUMN: &str = "Emissions per kilogram";
pub const SUPPLEMENTARY_VALUE_COLUMN: &str = "GHG emissions per kilogram (Poore & Nemecek, 2018)";

pub const EMISSION_DECIMALS: u32 = 2;

/// Foods shown when the caller selects nothing
pub const DEFAULT_FOODS: [&str; 6] = [
    "Coffee",
    "Beef (beef herd)",
    "Avocados",
    "Bread",
    "Eggs",
    "Milk",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub food: String,
    /// kg CO2-eq per kg of food
    pub ghg_emission: f64,
}

/// Colour-scale domain of the emissions chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionDomain {
    pub min: f64,
    pub max: f64,
}

/// Everyday activity used to put food emissions in context
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub activity: &'static str,
    pub low_kg_co2: f64,
    pub high_kg_co2: f64,
}

pub const REFERENCE_POINTS: [ReferencePoint; 4] = [
    ReferencePoint { activity: "1 km by diesel bus", low_kg_co2: 0.105, high_kg_co2: 0.105 },
    ReferencePoint { activity: "1 km of air travel (economy passenger)", low_kg_co2: 0.133, high_kg_co2: 0.133 },
    ReferencePoint { activity: "1 banana", low_kg_co2: 0.08, high_kg_co2: 0.08 },
    ReferencePoint { activity: "1 delivery by van (urban)", low_kg_co2: 0.5, high_kg_co2: 1.0 },
];

/// Read `Entity` and `value_column` from an emissions CSV
///
/// Rows without a name or a numeric value are skipped. Names are kept
/// verbatim, including surrounding whitespace. A name repeated within the
/// file keeps its first row. `Year` and `Code` are ignored.
pub fn read_emission_csv(path: &Path, value_column: &str) -> Result<Vec<EmissionFactor>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load emissions CSV: {:?}", path))?;

    let entities = df.column(ENTITY_COLUMN)
        .with_context(|| format!("Column '{}' not found in {:?}", ENTITY_COLUMN, path))?
        .str()
        .with_context(|| format!("Column '{}' is not string type", ENTITY_COLUMN))?;

    // Non-numeric cells become null on cast
    let values = df.column(value_column)
        .with_context(|| format!("Column '{}' not found in {:?}", value_column, path))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", value_column))?;
    let values = values.f64()?;

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut factors = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    let mut duplicates = 0usize;

    for (entity, value) in entities.into_iter().zip(values.into_iter()) {
        match (entity, value) {
            (Some(food), Some(ghg_emission)) if !food.is_empty() && ghg_emission.is_finite() => {
                if seen.insert(food) {
                    factors.push(EmissionFactor {
                        food: food.to_string(),
                        ghg_emission,
                    });
                } else {
                    duplicates += 1;
                }
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!("{:?}: skipped {} rows without a food name or value", path, skipped);
    }
    if duplicates > 0 {
        tracing::warn!("{:?}: ignored {} repeated food names", path, duplicates);
    }

    Ok(factors)
}

/// Merge primary and supplementary factors
///
/// Every primary food is kept; a supplementary food is added only when the
/// primary source does not name it. Values are rounded to 2 decimals and the
/// result is sorted by food name.
pub fn reconcile(primary: Vec<EmissionFactor>, supplementary: Vec<EmissionFactor>) -> EmissionTable {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut merged: Vec<EmissionFactor> = Vec::with_capacity(primary.len() + supplementary.len());

    for factor in primary {
        if seen.insert(factor.food.clone()) {
            merged.push(rounded(factor));
        }
    }

    let primary_count = merged.len();
    for factor in supplementary {
        if seen.insert(factor.food.clone()) {
            merged.push(rounded(factor));
        }
    }

    tracing::debug!(
        "Reconciled emissions: {} primary + {} supplementary",
        primary_count,
        merged.len() - primary_count
    );

    merged.sort_by(|a, b| a.food.cmp(&b.food));
    EmissionTable::from_sorted(merged)
}

fn rounded(factor: EmissionFactor) -> EmissionFactor {
    EmissionFactor {
        ghg_emission: round_to(factor.ghg_emission, EMISSION_DECIMALS),
        ..factor
    }
}

/// Merged emission factors with a name index
#[derive(Debug, Clone, Default)]
pub struct EmissionTable {
    factors: Vec<EmissionFactor>,
    index: FxHashMap<String, usize>,
}

impl EmissionTable {
    fn from_sorted(factors: Vec<EmissionFactor>) -> Self {
        let index = factors
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.food.clone(), idx))
            .collect();
        Self { factors, index }
    }

    /// Load and reconcile both CSV files from `data_dir`
    pub fn load(data_dir: &Path) -> Result<Self> {
        let primary_path = data_dir.join(PRIMARY_FILE);
        let supplementary_path = data_dir.join(SUPPLEMENTARY_FILE);

        let primary = read_emission_csv(&primary_path, PRIMARY_VALUE_COLUMN)?;
        let supplementary = read_emission_csv(&supplementary_path, SUPPLEMENTARY_VALUE_COLUMN)?;

        tracing::info!(
            "Loaded emission factors: primary {}, supplementary {}",
            primary.len(),
            supplementary.len()
        );

        let table = reconcile(primary, supplementary);
        tracing::info!("Merged emissions table: {} foods", table.len());
        Ok(table)
    }

    pub fn factors(&self) -> &[EmissionFactor] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn foods(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.food.as_str()).collect()
    }

    pub fn contains(&self, food: &str) -> bool {
        self.index.contains_key(food)
    }

    pub fn get(&self, food: &str) -> Option<f64> {
        self.index.get(food).map(|&idx| self.factors[idx].ghg_emission)
    }

    /// Emission factor of `food`, or `UnknownFood`
    pub fn lookup(&self, food: &str) -> Result<f64, FoodDataError> {
        self.get(food)
            .ok_or_else(|| FoodDataError::UnknownFood(food.to_string()))
    }

    /// Factors for `foods` in table order; unknown names are ignored
    pub fn select(&self, foods: &[String]) -> Vec<EmissionFactor> {
        let wanted: FxHashSet<&str> = foods.iter().map(|s| s.as_str()).collect();
        self.factors
            .iter()
            .filter(|f| wanted.contains(f.food.as_str()))
            .cloned()
            .collect()
    }

    /// Default foods that exist in this table
    pub fn default_foods(&self) -> Vec<String> {
        DEFAULT_FOODS
            .iter()
            .filter(|food| self.contains(food))
            .map(|food| food.to_string())
            .collect()
    }

    /// Smallest and largest factor over the whole table
    pub fn domain(&self) -> Option<EmissionDomain> {
        let mut values = self.factors.iter().map(|f| f.ghg_emission);
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(EmissionDomain { min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn factor(food: &str, ghg_emission: f64) -> EmissionFactor {
        EmissionFactor { food: food.to_string(), ghg_emission }
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    #[test]
    fn test_primary_wins_on_collision() {
        let table = reconcile(
            vec![factor("Beef", 27.0)],
            vec![factor("Beef", 30.0), factor("Avocado", 2.5)],
        );

        assert_eq!(table.factors(), &[factor("Avocado", 2.5), factor("Beef", 27.0)]);
    }

    #[test]
    fn test_names_unique_and_sorted() {
        let table = reconcile(
            vec![factor("Rice", 4.45), factor("Apples", 0.43), factor("Rice", 9.0)],
            vec![factor("Tofu", 3.16), factor("Apples", 1.0), factor("Tofu", 5.0)],
        );

        assert_eq!(table.foods(), vec!["Apples", "Rice", "Tofu"]);
        assert_relative_eq!(table.get("Rice").unwrap(), 4.45);
        assert_relative_eq!(table.get("Tofu").unwrap(), 3.16);
    }

    #[test]
    fn test_values_rounded_to_two_decimals() {
        let table = reconcile(vec![factor("Coffee", 28.5337)], vec![factor("Tofu", 3.1613)]);

        assert_relative_eq!(table.get("Coffee").unwrap(), 28.53);
        assert_relative_eq!(table.get("Tofu").unwrap(), 3.16);
    }

    #[test]
    fn test_lookup_unknown_food() {
        let table = reconcile(vec![factor("Milk", 3.15)], vec![]);

        assert_relative_eq!(table.lookup("Milk").unwrap(), 3.15);
        let err = table.lookup("Kale").unwrap_err();
        assert!(matches!(err, FoodDataError::UnknownFood(ref f) if f == "Kale"));
    }

    #[test]
    fn test_select_domain_and_defaults() {
        let table = reconcile(
            vec![factor("Coffee", 28.53), factor("Milk", 3.15), factor("Apples", 0.43)],
            vec![],
        );

        let selected = table.select(&["Milk".to_string(), "Coffee".to_string(), "Nope".to_string()]);
        let names: Vec<&str> = selected.iter().map(|f| f.food.as_str()).collect();
        assert_eq!(names, vec!["Coffee", "Milk"]);

        assert_eq!(table.domain(), Some(EmissionDomain { min: 0.43, max: 28.53 }));
        assert_eq!(table.default_foods(), vec!["Coffee", "Milk"]);
        assert_eq!(EmissionTable::default().domain(), None);
    }

    #[test]
    fn test_load_fixture_files() {
        let table = EmissionTable::load(&fixtures_dir()).unwrap();

        // Primary value (rounded) beats the supplementary one
        assert_relative_eq!(table.get("Beef (beef herd)").unwrap(), 99.48);
        // Supplementary-only foods are added
        assert_relative_eq!(table.get("Tofu").unwrap(), 3.16);
        assert!(table.contains("Lamb & Mutton"));
        // Row without a value is skipped
        assert!(!table.contains("Olive Oil"));

        let foods = table.foods();
        let mut sorted = foods.clone();
        sorted.sort();
        assert_eq!(foods, sorted);

        let unique: FxHashSet<&str> = foods.iter().copied().collect();
        assert_eq!(unique.len(), foods.len());
    }

    #[test]
    fn test_names_kept_verbatim() {
        let path = std::env::temp_dir().join(format!("food_emissions_verbatim_{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "Entity,Code,Year,Emissions per kilogram\nMilk,,2010,3.15\n\"Milk \",,2010,9.0\n",
        )
        .unwrap();

        let factors = read_emission_csv(&path, PRIMARY_VALUE_COLUMN).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(factors, vec![factor("Milk", 3.15), factor("Milk ", 9.0)]);
    }

    #[test]
    fn test_read_missing_file_is_error() {
        let result = read_emission_csv(&fixtures_dir().join("absent.csv"), PRIMARY_VALUE_COLUMN);
        assert!(result.is_err());
    }
}
