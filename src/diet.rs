//! Diet emissions calculator
//!
//! A `DietSelection` holds weekly quantities (kg) per food in the order the
//! foods were selected. `calculate` weights each quantity by the food's
//! emission factor and annualizes the weekly total.

use crate::emissions::EmissionTable;
use crate::error::FoodDataError;
use serde::{Deserialize, Serialize};

pub const WEEKS_PER_YEAR: f64 = 52.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietEntry {
    pub food: String,
    /// kg per week
    pub weekly_kg: f64,
}

/// Per-session weekly quantities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DietSelection {
    entries: Vec<DietEntry>,
}

fn validate_quantity(food: &str, weekly_kg: f64) -> Result<(), FoodDataError> {
    if !weekly_kg.is_finite() || weekly_kg < 0.0 {
        return Err(FoodDataError::InvalidQuantity {
            food: food.to_string(),
            quantity: weekly_kg,
        });
    }
    Ok(())
}

impl DietSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries; a repeated food keeps its first position and the
    /// last quantity
    pub fn from_entries(entries: Vec<DietEntry>) -> Result<Self, FoodDataError> {
        let mut selection = Self::new();
        for entry in entries {
            selection.set_quantity(&entry.food, entry.weekly_kg)?;
        }
        Ok(selection)
    }

    pub fn entries(&self) -> &[DietEntry] {
        &self.entries
    }

    pub fn foods(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.food.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quantity(&self, food: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.food == food)
            .map(|e| e.weekly_kg)
    }

    /// Sync with a new list of selected foods
    ///
    /// Quantities of foods still selected are kept, deselected foods are
    /// dropped, newly selected foods start at 0 kg. The result follows the
    /// order of `foods`.
    pub fn select_foods(&mut self, foods: &[String]) {
        let mut entries: Vec<DietEntry> = Vec::with_capacity(foods.len());
        for food in foods {
            if entries.iter().any(|e| &e.food == food) {
                continue;
            }
            let weekly_kg = self.quantity(food).unwrap_or(0.0);
            entries.push(DietEntry {
                food: food.clone(),
                weekly_kg,
            });
        }
        self.entries = entries;
    }

    /// Set the weekly quantity of `food`, selecting it if needed
    pub fn set_quantity(&mut self, food: &str, weekly_kg: f64) -> Result<(), FoodDataError> {
        validate_quantity(food, weekly_kg)?;
        match self.entries.iter_mut().find(|e| e.food == food) {
            Some(entry) => entry.weekly_kg = weekly_kg,
            None => self.entries.push(DietEntry {
                food: food.to_string(),
                weekly_kg,
            }),
        }
        Ok(())
    }

    /// Deselect `food`; returns whether it was selected
    pub fn remove(&mut self, food: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.food != food);
        self.entries.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEmission {
    pub food: String,
    pub weekly_kg: f64,
    /// kg CO2-eq per kg
    pub ghg_emission: f64,
    pub weekly_kg_co2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietEmissions {
    pub items: Vec<FoodEmission>,
    pub total_weekly_kg_co2: f64,
    pub total_annual_kg_co2: f64,
}

impl DietEmissions {
    /// Items ordered by weekly emissions, largest first
    pub fn sorted_by_emissions(&self) -> Vec<&FoodEmission> {
        let mut items: Vec<&FoodEmission> = self.items.iter().collect();
        items.sort_by(|a, b| b.weekly_kg_co2.total_cmp(&a.weekly_kg_co2));
        items
    }
}

pub fn annualize(weekly_kg_co2: f64) -> f64 {
    weekly_kg_co2 * WEEKS_PER_YEAR
}

/// Weekly and annual emissions of `selection`
///
/// Every selected food must exist in `emissions`; the first one that does
/// not fails the whole calculation with `UnknownFood`.
pub fn calculate(
    selection: &DietSelection,
    emissions: &EmissionTable,
) -> Result<DietEmissions, FoodDataError> {
    let items = selection
        .entries()
        .iter()
        .map(|entry| {
            let ghg_emission = emissions.lookup(&entry.food)?;
            Ok(FoodEmission {
                food: entry.food.clone(),
                weekly_kg: entry.weekly_kg,
                ghg_emission,
                weekly_kg_co2: entry.weekly_kg * ghg_emission,
            })
        })
        .collect::<Result<Vec<_>, FoodDataError>>()?;

    let total_weekly_kg_co2: f64 = items.iter().map(|i| i.weekly_kg_co2).sum();

    Ok(DietEmissions {
        items,
        total_weekly_kg_co2,
        total_annual_kg_co2: annualize(total_weekly_kg_co2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emissions::{reconcile, EmissionFactor};
    use approx::assert_relative_eq;

    fn emissions() -> EmissionTable {
        reconcile(
            vec![
                EmissionFactor { food: "Beef (beef herd)".to_string(), ghg_emission: 99.48 },
                EmissionFactor { food: "Coffee".to_string(), ghg_emission: 28.53 },
                EmissionFactor { food: "Milk".to_string(), ghg_emission: 3.15 },
            ],
            vec![],
        )
    }

    #[test]
    fn test_weighted_sum_and_annualization() {
        let mut selection = DietSelection::new();
        selection.set_quantity("Milk", 2.0).unwrap();
        selection.set_quantity("Coffee", 0.1).unwrap();

        let result = calculate(&selection, &emissions()).unwrap();

        assert_eq!(result.items.len(), 2);
        assert_relative_eq!(result.items[0].weekly_kg_co2, 6.3, epsilon = 1e-9);
        assert_relative_eq!(result.items[1].weekly_kg_co2, 2.853, epsilon = 1e-9);
        assert_relative_eq!(result.total_weekly_kg_co2, 9.153, epsilon = 1e-9);
        assert_eq!(result.total_annual_kg_co2, result.total_weekly_kg_co2 * 52.0);
    }

    #[test]
    fn test_empty_selection_is_zero() {
        let result = calculate(&DietSelection::new(), &emissions()).unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total_weekly_kg_co2, 0.0);
        assert_eq!(result.total_annual_kg_co2, 0.0);
    }

    #[test]
    fn test_unknown_food_fails_calculation() {
        let mut selection = DietSelection::new();
        selection.set_quantity("Milk", 1.0).unwrap();
        selection.set_quantity("Kale", 1.0).unwrap();

        let err = calculate(&selection, &emissions()).unwrap_err();
        assert!(matches!(err, FoodDataError::UnknownFood(ref f) if f == "Kale"));
    }

    #[test]
    fn test_negative_and_nan_quantities_rejected() {
        let mut selection = DietSelection::new();
        assert!(selection.set_quantity("Milk", -0.5).is_err());
        assert!(selection.set_quantity("Milk", f64::NAN).is_err());
        assert!(selection.is_empty());
        assert!(selection.set_quantity("Milk", 0.0).is_ok());
    }

    #[test]
    fn test_select_foods_keeps_drops_and_adds() {
        let mut selection = DietSelection::new();
        selection.set_quantity("Milk", 2.0).unwrap();
        selection.set_quantity("Coffee", 0.1).unwrap();

        selection.select_foods(&[
            "Coffee".to_string(),
            "Beef (beef herd)".to_string(),
            "Coffee".to_string(),
        ]);

        assert_eq!(selection.foods(), vec!["Coffee", "Beef (beef herd)"]);
        assert_eq!(selection.quantity("Coffee"), Some(0.1));
        assert_eq!(selection.quantity("Beef (beef herd)"), Some(0.0));
        assert_eq!(selection.quantity("Milk"), None);
    }

    #[test]
    fn test_from_entries_and_remove() {
        let mut selection = DietSelection::from_entries(vec![
            DietEntry { food: "Milk".to_string(), weekly_kg: 1.0 },
            DietEntry { food: "Coffee".to_string(), weekly_kg: 0.2 },
            DietEntry { food: "Milk".to_string(), weekly_kg: 3.0 },
        ])
        .unwrap();

        assert_eq!(selection.foods(), vec!["Milk", "Coffee"]);
        assert_eq!(selection.quantity("Milk"), Some(3.0));

        assert!(selection.remove("Milk"));
        assert!(!selection.remove("Milk"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_sorted_by_emissions() {
        let selection = DietSelection::from_entries(vec![
            DietEntry { food: "Milk".to_string(), weekly_kg: 1.0 },
            DietEntry { food: "Beef (beef herd)".to_string(), weekly_kg: 0.5 },
        ])
        .unwrap();

        let result = calculate(&selection, &emissions()).unwrap();
        let order: Vec<&str> = result.sorted_by_emissions().iter().map(|i| i.food.as_str()).collect();
        assert_eq!(order, vec!["Beef (beef herd)", "Milk"]);
    }
}
