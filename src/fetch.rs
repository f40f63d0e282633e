//! Consumption statistics fetcher
//!
//! Issues one POST to the LUKE PxWeb API (food consumption per capita,
//! table `03_Elintarvikkeiden_kulutus_50`) and turns the response into a
//! wide [`ConsumptionTable`]. The call is synchronous; there is no retry.
//!
//! Request body shape:
//! ```json
//! {"query": [{"code": "Vuosi", "selection": {"filter": "item", "values": ["1950", ...]}},
//!            {"code": "Elintarvike", "selection": {"filter": "item", "values": ["Vilja", ...],
//!                                                  "valueTexts": ["Cereals", ...]}}],
//!  "response": {"format": "json"}}
//! ```
//! Response records look like `{"key": ["1950", "Vilja"], "values": ["123.4"]}`;
//! `".."` marks a missing value.

use crate::consumption::{ConsumptionTable, YearRange};
use crate::error::FetchError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LUKE_API_URL: &str = "https://statdb.luke.fi:443/PxWeb/api/v1/en/LUKE/02%20Maatalous/08%20Muut/02%20Ravintotase/03_Elintarvikkeiden_kulutus_50.px";

pub const DEFAULT_FIRST_YEAR: i32 = 1950;
pub const DEFAULT_LAST_YEAR: i32 = 2023;

const YEAR_DIMENSION: &str = "Vuosi";
const FOOD_DIMENSION: &str = "Elintarvike";

/// A food category as coded by the statistics API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodCategory {
    /// Finnish value code used in the query and response keys
    pub code: &'static str,
    /// English column name
    pub name: &'static str,
}

const fn category(code: &'static str, name: &'static str) -> FoodCategory {
    FoodCategory { code, name }
}

/// Fixed category list requested from the API
pub const FOOD_CATEGORIES: [FoodCategory; 22] = [
    category("Vilja", "Cereals"),
    category("Peruna", "Potatoes"),
    category("Maito", "Milk"),
    category("Liha", "Meat"),
    category("Kala", "Fish"),
    category("Vehnä", "Wheat"),
    category("Ruis", "Rye"),
    category("Ohra", "Barley"),
    category("Kaura", "Oats"),
    category("Riisi", "Rice"),
    category("Naudanliha", "Beef and veal"),
    category("Sianliha", "Pork"),
    category("Siipikarjanliha", "Poultry meat"),
    category("Kananmunat", "Eggs"),
    category("Tilamaito", "Farm milk"),
    category("Täysmaito", "Whole milk"),
    category("Kevytmaito", "Low-fat milk"),
    category("Rasvaton maito", "Skimmed milk"),
    category("Piimä", "Sour milk"),
    category("Jogurtti", "Yoghurt"),
    category("Juusto", "Cheese"),
    category("Voi", "Butter"),
];

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PxQuery {
    pub query: Vec<PxQueryItem>,
    pub response: PxResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct PxQueryItem {
    pub code: String,
    pub selection: PxSelection,
}

#[derive(Debug, Clone, Serialize)]
pub struct PxSelection {
    pub filter: String,
    pub values: Vec<String>,
    #[serde(rename = "valueTexts", skip_serializing_if = "Option::is_none")]
    pub value_texts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PxResponseFormat {
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PxResponse {
    pub data: Vec<PxRecord>,
}

/// One observation: `key = [year, category code]`, `values = [value]`
///
/// Values are usually strings but numbers are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct PxRecord {
    pub key: Vec<String>,
    pub values: Vec<serde_json::Value>,
}

/// Build the query body for `years` and `categories`
pub fn build_query(years: YearRange, categories: &[FoodCategory]) -> PxQuery {
    PxQuery {
        query: vec![
            PxQueryItem {
                code: YEAR_DIMENSION.to_string(),
                selection: PxSelection {
                    filter: "item".to_string(),
                    values: years.years().map(|y| y.to_string()).collect(),
                    value_texts: None,
                },
            },
            PxQueryItem {
                code: FOOD_DIMENSION.to_string(),
                selection: PxSelection {
                    filter: "item".to_string(),
                    values: categories.iter().map(|c| c.code.to_string()).collect(),
                    value_texts: Some(categories.iter().map(|c| c.name.to_string()).collect()),
                },
            },
        ],
        response: PxResponseFormat {
            format: "json".to_string(),
        },
    }
}

/// Coerce a response value to a number
///
/// Placeholders such as `".."`, other non-numeric text and non-finite
/// numbers become missing.
pub fn coerce_value(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Turn response records into a wide consumption table
///
/// Category codes are renamed through `categories`; unknown codes keep the
/// raw code and are appended after the known categories in order of first
/// appearance. For repeated (year, category) pairs the first non-missing
/// value is kept. The result is not interpolated.
pub fn records_to_table(
    records: &[PxRecord],
    categories: &[FoodCategory],
) -> Result<ConsumptionTable, FetchError> {
    let names: FxHashMap<&str, &str> = categories.iter().map(|c| (c.code, c.name)).collect();

    let mut column_order: Vec<String> = Vec::new();
    let mut by_year: BTreeMap<i32, FxHashMap<String, f64>> = BTreeMap::new();
    let mut seen_codes: Vec<&str> = Vec::new();

    for record in records {
        let (year_raw, code) = match record.key.as_slice() {
            [year, code, ..] => (year, code.as_str()),
            _ => {
                return Err(FetchError::MalformedRecord(format!(
                    "expected [year, category] key, got {:?}",
                    record.key
                )))
            }
        };
        let year: i32 = year_raw.trim().parse().map_err(|_| {
            FetchError::MalformedRecord(format!("non-integer year '{}'", year_raw))
        })?;

        if !seen_codes.contains(&code) {
            seen_codes.push(code);
        }
        let name = names.get(code).copied().unwrap_or(code).to_string();

        let row = by_year.entry(year).or_default();
        if let Some(value) = record.values.first().and_then(coerce_value) {
            row.entry(name).or_insert(value);
        }
    }

    // Known categories in list order, then unknown codes as they appeared
    for category in categories {
        if seen_codes.contains(&category.code) {
            column_order.push(category.name.to_string());
        }
    }
    for code in &seen_codes {
        if !names.contains_key(code) {
            column_order.push(code.to_string());
        }
    }

    let years: Vec<i32> = by_year.keys().copied().collect();
    let columns: Vec<(String, Vec<Option<f64>>)> = column_order
        .into_iter()
        .map(|name| {
            let values: Vec<Option<f64>> = by_year.values().map(|row| row.get(&name).copied()).collect();
            (name, values)
        })
        .collect();

    Ok(ConsumptionTable::from_columns(years, columns)?)
}

/// Parse a response body into a (not yet interpolated) consumption table
pub fn parse_response(body: &str, categories: &[FoodCategory]) -> Result<ConsumptionTable, FetchError> {
    let response: PxResponse = serde_json::from_str(body)?;
    records_to_table(&response.data, categories)
}

// ============================================================================
// Sources
// ============================================================================

/// Anything that can produce a consumption table
///
/// The HTTP client is the production source; a fixed table stands in for
/// it in tests and offline runs.
pub trait ConsumptionSource: Send + Sync {
    fn fetch(&self) -> Result<ConsumptionTable, FetchError>;
}

/// Blocking client for the LUKE statistics API
///
/// The underlying HTTP client is created per fetch, on the calling thread,
/// so the value can be built inside an async runtime and fetched from a
/// blocking task.
#[derive(Debug, Clone)]
pub struct LukeClient {
    url: String,
    years: YearRange,
}

impl LukeClient {
    pub fn new(url: impl Into<String>, years: YearRange) -> Self {
        Self {
            url: url.into(),
            years,
        }
    }

    /// Fetch the raw (not interpolated) table
    pub fn fetch_raw(&self) -> Result<ConsumptionTable, FetchError> {
        let query = build_query(self.years, &FOOD_CATEGORIES);

        tracing::info!(
            "Fetching food consumption {}-{} ({} categories)",
            self.years.start,
            self.years.end,
            FOOD_CATEGORIES.len()
        );
        let body = reqwest::blocking::Client::new()
            .post(&self.url)
            .json(&query)
            .send()?
            .error_for_status()?
            .text()?;

        let table = parse_response(&body, &FOOD_CATEGORIES)?;
        tracing::info!(
            "Fetched {} years x {} categories",
            table.height(),
            table.categories().len()
        );
        Ok(table)
    }
}

impl Default for LukeClient {
    fn default() -> Self {
        Self::new(LUKE_API_URL, YearRange::new(DEFAULT_FIRST_YEAR, DEFAULT_LAST_YEAR))
    }
}

impl ConsumptionSource for LukeClient {
    /// Fetch and interpolate
    fn fetch(&self) -> Result<ConsumptionTable, FetchError> {
        Ok(self.fetch_raw()?.interpolated()?)
    }
}

/// A source that always returns the same table
pub struct StaticSource(pub ConsumptionTable);

impl ConsumptionSource for StaticSource {
    fn fetch(&self) -> Result<ConsumptionTable, FetchError> {
        Ok(self.0.clone())
    }
}
