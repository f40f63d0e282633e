//! Food consumption table
//!
//! Wide table of kg/person/year: an `Int32` `Year` column followed by one
//! `Float64` column per food category (English names), one row per year,
//! rows sorted by year. Filtering, reshaping and summary helpers all return
//! new values; a table is never mutated in place.

use crate::error::FoodDataError;
use crate::utils::{interpolate_linear, materialize_with_columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const YEAR_COLUMN: &str = "Year";

/// Categories shown when the caller selects nothing
pub const DEFAULT_CATEGORIES: [&str; 3] = ["Milk", "Meat", "Eggs"];

/// Inclusive year range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Reject ranges whose start is after their end
    pub fn validated(self) -> Result<Self, FoodDataError> {
        if self.start > self.end {
            return Err(FoodDataError::InvalidYearRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(self)
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// One long-form row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionPoint {
    pub year: i32,
    pub food: String,
    pub consumption: f64,
}

/// A value and the year it was observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub year: i32,
    pub value: f64,
}

/// Lowest and highest consumption of one category
///
/// Both are `None` when the category has no values in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExtremes {
    pub food: String,
    pub lowest: Option<Extreme>,
    pub highest: Option<Extreme>,
}

#[derive(Debug, Clone)]
pub struct ConsumptionTable {
    df: DataFrame,
}

impl ConsumptionTable {
    /// Build a table from a year axis and named value columns
    pub fn from_columns(
        years: Vec<i32>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, FoodDataError> {
        let mut frame_columns: Vec<Column> = Vec::with_capacity(columns.len() + 1);
        frame_columns.push(Series::new(YEAR_COLUMN.into(), years).into());
        for (name, values) in columns {
            frame_columns.push(Series::new(name.as_str().into(), values).into());
        }

        Self::from_dataframe(DataFrame::new(frame_columns)?)
    }

    /// Normalize an arbitrary wide frame into a consumption table
    ///
    /// `Year` is cast to `Int32`, every other column to `Float64`.
    /// Non-numeric values become missing; rows without a year are dropped.
    pub fn from_dataframe(df: DataFrame) -> Result<Self, FoodDataError> {
        let year = df
            .column(YEAR_COLUMN)
            .map_err(|_| FoodDataError::MissingColumn(YEAR_COLUMN.to_string()))?;

        let mut columns: Vec<Column> = Vec::with_capacity(df.width());
        columns.push(year.cast(&DataType::Int32)?);
        for column in df.get_columns() {
            if column.name().as_str() == YEAR_COLUMN {
                continue;
            }
            columns.push(column.cast(&DataType::Float64)?);
        }

        let df = DataFrame::new(columns)?
            .lazy()
            .filter(col(YEAR_COLUMN).is_not_null())
            .sort([YEAR_COLUMN], Default::default())
            .collect()?;

        Ok(Self { df })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of years (rows)
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Category column names, in table order
    pub fn categories(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != YEAR_COLUMN)
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_category(&self, category: &str) -> bool {
        category != YEAR_COLUMN && self.df.column(category).is_ok()
    }

    /// Default categories that exist in this table
    pub fn default_categories(&self) -> Vec<String> {
        DEFAULT_CATEGORIES
            .iter()
            .filter(|name| self.has_category(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn years(&self) -> Result<Vec<i32>, FoodDataError> {
        Ok(self
            .df
            .column(YEAR_COLUMN)?
            .i32()?
            .into_iter()
            .flatten()
            .collect())
    }

    /// First and last year in the table
    pub fn year_bounds(&self) -> Result<Option<YearRange>, FoodDataError> {
        let years = self.years()?;
        Ok(match (years.first(), years.last()) {
            (Some(&start), Some(&end)) => Some(YearRange::new(start, end)),
            _ => None,
        })
    }

    /// Values of one category, aligned with `years()`
    pub fn series(&self, category: &str) -> Result<Vec<Option<f64>>, FoodDataError> {
        if !self.has_category(category) {
            return Err(FoodDataError::UnknownCategory(category.to_string()));
        }
        Ok(self.df.column(category)?.f64()?.into_iter().collect())
    }

    /// Fill gaps in every category by linear interpolation on the year axis
    pub fn interpolated(&self) -> Result<Self, FoodDataError> {
        let years = self.years()?;
        let mut columns = Vec::new();
        for category in self.categories() {
            let values = self.series(&category)?;
            let filled = interpolate_linear(&years, &values);
            columns.push((category, filled));
        }
        Self::from_columns(years, columns)
    }

    /// Rows whose year lies in `range` (inclusive)
    pub fn filter_years(&self, range: YearRange) -> Result<Self, FoodDataError> {
        let range = range.validated()?;
        let df = self
            .df
            .clone()
            .lazy()
            .filter(
                col(YEAR_COLUMN)
                    .gt_eq(lit(range.start))
                    .and(col(YEAR_COLUMN).lt_eq(lit(range.end))),
            )
            .collect()?;
        Ok(Self { df })
    }

    /// Keep only `categories`, in the requested order
    ///
    /// Repeated names are kept once. Any unknown name is an error.
    pub fn select_categories(&self, categories: &[String]) -> Result<Self, FoodDataError> {
        let mut columns: Vec<&str> = vec![YEAR_COLUMN];
        for category in categories {
            if !self.has_category(category) {
                return Err(FoodDataError::UnknownCategory(category.clone()));
            }
            if !columns.contains(&category.as_str()) {
                columns.push(category.as_str());
            }
        }

        let df = materialize_with_columns(&self.df.clone().lazy(), &columns, "consumption subset")
            .map_err(|e| FoodDataError::Frame(format!("{:#}", e)))?;
        Ok(Self { df })
    }

    /// Reshape to long form, ordered by category then year
    ///
    /// Missing values are omitted.
    pub fn long_records(&self) -> Result<Vec<ConsumptionPoint>, FoodDataError> {
        let years = self.years()?;
        let mut records = Vec::new();
        for category in self.categories() {
            let values = self.series(&category)?;
            for (&year, value) in years.iter().zip(values) {
                if let Some(consumption) = value {
                    records.push(ConsumptionPoint {
                        year,
                        food: category.clone(),
                        consumption,
                    });
                }
            }
        }
        Ok(records)
    }

    /// Lowest and highest value of every category with the year it occurred
    ///
    /// On ties the earliest year wins.
    pub fn extremes(&self) -> Result<Vec<CategoryExtremes>, FoodDataError> {
        let years = self.years()?;
        self.categories()
            .into_iter()
            .map(|food| {
                let values = self.series(&food)?;
                let mut lowest: Option<Extreme> = None;
                let mut highest: Option<Extreme> = None;

                for (&year, value) in years.iter().zip(values) {
                    let Some(value) = value else { continue };
                    if lowest.map_or(true, |e| value < e.value) {
                        lowest = Some(Extreme { year, value });
                    }
                    if highest.map_or(true, |e| value > e.value) {
                        highest = Some(Extreme { year, value });
                    }
                }

                Ok(CategoryExtremes { food, lowest, highest })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_table() -> ConsumptionTable {
        ConsumptionTable::from_columns(
            vec![2000, 2001, 2002, 2003],
            vec![
                ("Milk".to_string(), vec![Some(130.0), Some(125.0), None, Some(110.0)]),
                ("Eggs".to_string(), vec![None, Some(10.0), Some(11.0), Some(10.0)]),
                ("Rice".to_string(), vec![None, None, None, None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_dataframe_sorts_and_coerces() {
        let df = df![
            "Year" => &[2001i64, 2000],
            "Milk" => &["1.5", ".."],
        ]
        .unwrap();

        let table = ConsumptionTable::from_dataframe(df).unwrap();

        assert_eq!(table.years().unwrap(), vec![2000, 2001]);
        assert_eq!(table.series("Milk").unwrap(), vec![None, Some(1.5)]);
    }

    #[test]
    fn test_from_dataframe_requires_year() {
        let df = df!["Milk" => &[1.0]].unwrap();
        let err = ConsumptionTable::from_dataframe(df).unwrap_err();
        assert!(matches!(err, FoodDataError::MissingColumn(_)));
    }

    #[test]
    fn test_interpolated_fills_interior_gaps() {
        let table = sample_table().interpolated().unwrap();

        let milk = table.series("Milk").unwrap();
        assert_relative_eq!(milk[2].unwrap(), 117.5);

        let eggs = table.series("Eggs").unwrap();
        assert_eq!(eggs[0], None);
        assert!(eggs[1..].iter().all(|v| v.is_some()));
    }

    #[test]
    fn test_filter_years_inclusive() {
        let filtered = sample_table().filter_years(YearRange::new(2001, 2002)).unwrap();
        assert_eq!(filtered.years().unwrap(), vec![2001, 2002]);
    }

    #[test]
    fn test_filter_years_rejects_inverted_range() {
        let err = sample_table().filter_years(YearRange::new(2003, 2000)).unwrap_err();
        assert!(matches!(err, FoodDataError::InvalidYearRange { start: 2003, end: 2000 }));
    }

    #[test]
    fn test_select_categories_order_and_unknown() {
        let table = sample_table();

        let subset = table
            .select_categories(&["Eggs".to_string(), "Milk".to_string(), "Eggs".to_string()])
            .unwrap();
        assert_eq!(subset.categories(), vec!["Eggs", "Milk"]);

        let err = table.select_categories(&["Cheese".to_string()]).unwrap_err();
        assert!(matches!(err, FoodDataError::UnknownCategory(ref c) if c == "Cheese"));

        let err = table.select_categories(&["Year".to_string()]).unwrap_err();
        assert!(matches!(err, FoodDataError::UnknownCategory(_)));
    }

    #[test]
    fn test_long_form_drops_missing() {
        let table = sample_table().select_categories(&["Milk".to_string()]).unwrap();

        let records = table.long_records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            ConsumptionPoint { year: 2000, food: "Milk".to_string(), consumption: 130.0 }
        );
    }

    #[test]
    fn test_extremes_with_locations() {
        let extremes = sample_table().extremes().unwrap();

        let milk = &extremes[0];
        assert_eq!(milk.food, "Milk");
        assert_eq!(milk.lowest, Some(Extreme { year: 2003, value: 110.0 }));
        assert_eq!(milk.highest, Some(Extreme { year: 2000, value: 130.0 }));

        // Tie on 10.0: earliest year wins
        let eggs = &extremes[1];
        assert_eq!(eggs.lowest, Some(Extreme { year: 2001, value: 10.0 }));
        assert_eq!(eggs.highest, Some(Extreme { year: 2002, value: 11.0 }));

        let rice = &extremes[2];
        assert_eq!(rice.lowest, None);
        assert_eq!(rice.highest, None);
    }

    #[test]
    fn test_bounds_and_defaults() {
        let table = sample_table();
        assert_eq!(table.year_bounds().unwrap(), Some(YearRange::new(2000, 2003)));
        assert_eq!(table.default_categories(), vec!["Milk", "Eggs"]);
        assert!(!table.has_category("Year"));
    }
}
