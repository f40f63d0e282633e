// Axum API Server Module
//
// Purpose: JSON endpoints for the three dashboard views (consumption trends,
// food emission factors, diet calculator) plus per-session diet selections.
// The consumption table is fetched on demand and reused until its TTL runs out.

#[cfg(feature = "api")]
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use moka::future::Cache;

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use crate::config::Config;

#[cfg(feature = "api")]
use crate::consumption::{ConsumptionTable, YearRange};

#[cfg(feature = "api")]
use crate::diet::{calculate, DietEmissions, DietEntry, DietSelection};

#[cfg(feature = "api")]
use crate::emissions::{EmissionTable, REFERENCE_POINTS};

#[cfg(feature = "api")]
use crate::error::FoodDataError;

#[cfg(feature = "api")]
use crate::fetch::{ConsumptionSource, LukeClient};

#[cfg(feature = "api")]
use crate::session::DietSessions;

#[cfg(feature = "api")]
const CONSUMPTION_KEY: &str = "consumption";

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub emissions: Arc<EmissionTable>,
    pub sessions: DietSessions,
    source: Arc<dyn ConsumptionSource>,
    consumption_cache: Cache<&'static str, Arc<ConsumptionTable>>,
}

#[cfg(feature = "api")]
impl AppState {
    /// Load emission factors and prepare the statistics API source
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        tracing::info!("Loading emission factors from {:?}...", config.data_dir);
        let data_dir = config.data_dir.clone();
        let emissions = tokio::task::spawn_blocking(move || EmissionTable::load(&data_dir)).await??;

        let source: Arc<dyn ConsumptionSource> =
            Arc::new(LukeClient::new(config.luke_api_url.clone(), config.years));
        let state = Self::with_source(source, emissions, config);

        // Warm the cache; a failing upstream is reported per request later
        tracing::info!("Fetching initial consumption table...");
        if let Err(e) = state.consumption().await {
            tracing::warn!("Initial consumption fetch failed: {}", e.message());
        }

        Ok(state)
    }

    /// Build state from an explicit consumption source
    pub fn with_source(
        source: Arc<dyn ConsumptionSource>,
        emissions: EmissionTable,
        config: &Config,
    ) -> Self {
        tracing::info!("Initializing Moka caches (consumption TTL {:?}, session idle {:?})",
            config.consumption_ttl, config.session_idle);
        let consumption_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.consumption_ttl)
            .build();

        Self {
            emissions: Arc::new(emissions),
            sessions: DietSessions::new(config.session_idle),
            source,
            consumption_cache,
        }
    }

    /// Cached consumption table, fetched on a blocking thread when absent
    pub async fn consumption(&self) -> Result<Arc<ConsumptionTable>, AppError> {
        let source = self.source.clone();
        self.consumption_cache
            .try_get_with(CONSUMPTION_KEY, async move {
                match tokio::task::spawn_blocking(move || source.fetch()).await {
                    Ok(Ok(table)) => Ok(Arc::new(table)),
                    Ok(Err(e)) => Err(AppError::Upstream(e.to_string())),
                    Err(e) => Err(AppError::Internal(format!("Task join error: {}", e))),
                }
            })
            .await
            .map_err(|e| (*e).clone())
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Consumption (tab 1)
        .route("/api/consumption", get(get_consumption))
        .route("/api/consumption/categories", get(get_categories))

        // Emission factors (tab 2)
        .route("/api/emissions", get(get_emissions))
        .route("/api/emissions/foods", get(get_emission_foods))
        .route("/api/emissions/reference-points", get(get_reference_points))

        // Diet calculator (tab 3)
        .route("/api/diet/calculate", post(calculate_diet))
        .route("/api/sessions/:id", delete(end_session))
        .route("/api/sessions/:id/diet", get(get_session_diet))
        .route("/api/sessions/:id/diet/foods", put(select_session_foods))
        .route("/api/sessions/:id/diet/quantities", put(set_session_quantity))
        .route("/api/sessions/:id/diet/calculate", post(calculate_session_diet))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(feature = "api")]
async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let table = state.consumption().await?;
    let years = table.year_bounds()?;

    Ok(Json(serde_json::json!({
        "categories": table.categories(),
        "years": years,
        "defaults": table.default_categories(),
    })))
}

/// Long-form series and per-food extremes for the selected foods and years
///
/// Defaults: the standard category selection and the full year range.
#[cfg(feature = "api")]
async fn get_consumption(
    State(state): State<AppState>,
    query: Result<Query<ConsumptionQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(query) = query?;
    let table = state.consumption().await?;

    let bounds = table
        .year_bounds()?
        .ok_or_else(|| AppError::Upstream("Consumption table is empty".to_string()))?;
    let years = YearRange::new(
        query.start.unwrap_or(bounds.start),
        query.end.unwrap_or(bounds.end),
    );

    let foods = match query.foods.as_deref() {
        Some(raw) => parse_list(raw),
        None => table.default_categories(),
    };

    tracing::debug!("Consumption query: foods={:?} years={:?}", foods, years);

    let selected = table.filter_years(years)?.select_categories(&foods)?;
    let records = selected.long_records()?;
    let extremes = selected.extremes()?;

    Ok(Json(serde_json::json!({
        "years": years,
        "foods": foods,
        "rows": records.len(),
        "data": records,
        "extremes": extremes,
    })))
}

#[cfg(feature = "api")]
async fn get_emissions(
    State(state): State<AppState>,
    query: Result<Query<EmissionsQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(query) = query?;
    let foods = match query.foods.as_deref() {
        Some(raw) => parse_list(raw),
        None => state.emissions.default_foods(),
    };

    let selected = state.emissions.select(&foods);

    Ok(Json(serde_json::json!({
        "rows": selected.len(),
        "data": selected,
        "domain": state.emissions.domain(),
    })))
}

#[cfg(feature = "api")]
async fn get_emission_foods(State(state): State<AppState>) -> Json<serde_json::Value> {
    let foods = state.emissions.foods();
    Json(serde_json::json!({
        "rows": foods.len(),
        "foods": foods,
    }))
}

#[cfg(feature = "api")]
async fn get_reference_points() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "reference_points": REFERENCE_POINTS,
    }))
}

/// Stateless calculation for a full list of quantities
#[cfg(feature = "api")]
async fn calculate_diet(
    State(state): State<AppState>,
    payload: Result<Json<DietRequest>, JsonRejection>,
) -> Result<Json<DietEmissions>, AppError> {
    let Json(payload) = payload?;
    let selection = DietSelection::from_entries(payload.quantities)?;
    tracing::info!("Calculating diet emissions for {} foods", selection.len());
    Ok(Json(calculate(&selection, &state.emissions)?))
}

#[cfg(feature = "api")]
async fn get_session_diet(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<DietSelection> {
    Json(state.sessions.get_or_default(&session_id).await)
}

#[cfg(feature = "api")]
async fn select_session_foods(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SelectFoodsRequest>, JsonRejection>,
) -> Result<Json<DietSelection>, AppError> {
    let Json(payload) = payload?;
    for food in &payload.foods {
        ensure_known_food(&state.emissions, food)?;
    }

    let selection = state
        .sessions
        .update(&session_id, |selection| {
            selection.select_foods(&payload.foods);
            Ok(selection.clone())
        })
        .await?;

    Ok(Json(selection))
}

#[cfg(feature = "api")]
async fn set_session_quantity(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<DietEntry>, JsonRejection>,
) -> Result<Json<DietSelection>, AppError> {
    let Json(payload) = payload?;
    ensure_known_food(&state.emissions, &payload.food)?;

    let selection = state
        .sessions
        .update(&session_id, |selection| {
            selection.set_quantity(&payload.food, payload.weekly_kg)?;
            Ok(selection.clone())
        })
        .await?;

    Ok(Json(selection))
}

#[cfg(feature = "api")]
async fn calculate_session_diet(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DietEmissions>, AppError> {
    let selection = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", session_id)))?;

    Ok(Json(calculate(&selection, &state.emissions)?))
}

#[cfg(feature = "api")]
async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session '{}' not found", session_id)))
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[cfg(feature = "api")]
#[derive(serde::Deserialize, Debug)]
struct ConsumptionQuery {
    /// Comma-separated category names
    foods: Option<String>,
    start: Option<i32>,
    end: Option<i32>,
}

#[cfg(feature = "api")]
#[derive(serde::Deserialize, Debug)]
struct EmissionsQuery {
    /// Comma-separated food names
    foods: Option<String>,
}

#[cfg(feature = "api")]
#[derive(serde::Deserialize, Debug)]
struct DietRequest {
    quantities: Vec<DietEntry>,
}

#[cfg(feature = "api")]
#[derive(serde::Deserialize, Debug)]
struct SelectFoodsRequest {
    foods: Vec<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Split a comma-separated list, dropping blanks
#[cfg(feature = "api")]
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(feature = "api")]
fn ensure_known_food(emissions: &EmissionTable, food: &str) -> Result<(), AppError> {
    if emissions.contains(food) {
        Ok(())
    } else {
        Err(FoodDataError::UnknownFood(food.to_string()).into())
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug, Clone)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    Internal(String),
}

#[cfg(feature = "api")]
impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Upstream(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

#[cfg(feature = "api")]
impl From<FoodDataError> for AppError {
    fn from(err: FoodDataError) -> Self {
        match err {
            FoodDataError::UnknownFood(_) | FoodDataError::UnknownCategory(_) => {
                AppError::NotFound(err.to_string())
            }
            FoodDataError::InvalidYearRange { .. } | FoodDataError::InvalidQuantity { .. } => {
                AppError::BadRequest(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

// Extractor rejections (malformed JSON body or query string) are bad input
#[cfg(feature = "api")]
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(feature = "api")]
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", status, message);
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(all(test, feature = "api"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("Milk, Meat,,Eggs "), vec!["Milk", "Meat", "Eggs"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_error_mapping() {
        let err: AppError = FoodDataError::UnknownCategory("Tea".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = FoodDataError::InvalidYearRange { start: 2, end: 1 }.into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = FoodDataError::Frame("boom".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
