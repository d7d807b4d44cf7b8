// 🌐 HTTP API - JSON surface over one in-memory form
// Routes are built here so the server binary and the tests share them.

use crate::error::EstimatorError;
use crate::form::{FormSnapshot, FormState};
use crate::index_rate::IndexRateProvider;
use crate::rates::{CategoryRate, RateTable, RateTriple};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    form: Arc<Mutex<FormState>>,
    /// Startup form; stateless estimates fill their gaps from it
    baseline: Arc<FormState>,
    provider: Arc<IndexRateProvider>,
}

impl AppState {
    pub fn new(form: FormState, provider: IndexRateProvider) -> Self {
        Self {
            baseline: Arc::new(form.clone()),
            form: Arc::new(Mutex::new(form)),
            provider: Arc::new(provider),
        }
    }

    // Every write leaves the form consistent, so a poisoned lock is still usable.
    fn form(&self) -> MutexGuard<'_, FormState> {
        self.form.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn reply<T: Serialize>(status: StatusCode, body: ApiResponse<T>) -> Response {
    (status, Json(body)).into_response()
}

/// Category row with a link to itself
#[derive(Serialize)]
pub struct CategoryResponse {
    pub name: &'static str,
    pub rates: RateTriple,
    pub href: String,
}

impl From<&CategoryRate> for CategoryResponse {
    fn from(row: &CategoryRate) -> Self {
        Self {
            name: row.name,
            rates: row.rates,
            href: format!("/api/categories/{}", urlencoding::encode(row.name)),
        }
    }
}

/// Partial form update; absent fields are left alone.
/// `construction_unit_cost: null` clears the construction reference.
#[derive(Debug, Default, Deserialize)]
pub struct FormUpdate {
    pub category: Option<String>,
    pub area_sqm: Option<f64>,
    pub index_rate: Option<f64>,
    pub surcharge_percent: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub construction_unit_cost: Option<Option<f64>>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query string for the stateless estimate
#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    pub category: String,
    pub area: Option<f64>,
    pub index_rate: Option<f64>,
    pub surcharge: Option<f64>,
    pub unit_cost: Option<f64>,
}

impl FormUpdate {
    /// Category goes first so an unknown name rejects the whole update
    fn apply(self, form: &mut FormState) -> Result<(), EstimatorError> {
        if let Some(category) = &self.category {
            form.set_category(category)?;
        }
        if let Some(area) = self.area_sqm {
            form.set_area(area);
        }
        if let Some(rate) = self.index_rate {
            form.set_index_rate(rate);
        }
        if let Some(surcharge) = self.surcharge_percent {
            form.set_surcharge_percent(surcharge);
        }
        if let Some(cost) = self.construction_unit_cost {
            form.set_construction_unit_cost(cost);
        }
        Ok(())
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/categories - Rate table in display order
async fn list_categories() -> impl IntoResponse {
    let rows: Vec<CategoryResponse> = RateTable::builtin()
        .rows()
        .iter()
        .map(CategoryResponse::from)
        .collect();
    Json(ApiResponse::ok(rows))
}

/// GET /api/categories/:name - One category
async fn get_category(Path(name): Path<String>) -> Response {
    match RateTable::builtin().get(&name) {
        Some(row) => reply(StatusCode::OK, ApiResponse::ok(CategoryResponse::from(row))),
        None => reply::<CategoryResponse>(
            StatusCode::NOT_FOUND,
            ApiResponse::err(EstimatorError::UnknownCategory(name).to_string()),
        ),
    }
}

/// GET /api/form - Current inputs and estimates
async fn get_form(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.form().snapshot()))
}

/// POST /api/form - Update some inputs
async fn update_form(State(state): State<AppState>, Json(update): Json<FormUpdate>) -> Response {
    debug!("Form update: {:?}", update);
    let mut form = state.form();

    // Validate on a copy so a rejected update changes nothing
    let mut next = form.clone();
    match update.apply(&mut next) {
        Ok(()) => {
            *form = next;
            reply(StatusCode::OK, ApiResponse::ok(form.snapshot()))
        }
        Err(e) => {
            warn!("Rejected form update: {}", e);
            reply::<FormSnapshot>(StatusCode::BAD_REQUEST, ApiResponse::err(e.to_string()))
        }
    }
}

/// POST /api/index-rate/fetch - Automatic UF value
///
/// The lock is not held during the request; overlapping fetches each write
/// back when they finish and the last one wins.
async fn fetch_index_rate(State(state): State<AppState>) -> Response {
    let result = state.provider.fetch_current_rate().await;

    let mut form = state.form();
    match form.apply_fetch_result(result) {
        Ok(rate) => {
            info!("Index rate updated to {}", rate);
            reply(StatusCode::OK, ApiResponse::ok(form.snapshot()))
        }
        Err(e) => reply::<FormSnapshot>(
            StatusCode::BAD_GATEWAY,
            ApiResponse::err(format!("{} ({})", e.user_notice(), e)),
        ),
    }
}

/// GET /api/estimate - Stateless estimate from query parameters
///
/// Omitted parameters take the configured defaults, not the live form.
async fn estimate(State(state): State<AppState>, Query(query): Query<EstimateQuery>) -> Response {
    let mut form = FormState::clone(&state.baseline);
    let update = FormUpdate {
        category: Some(query.category),
        area_sqm: query.area,
        index_rate: query.index_rate,
        surcharge_percent: query.surcharge,
        construction_unit_cost: Some(query.unit_cost),
    };

    match update.apply(&mut form) {
        Ok(()) => reply(StatusCode::OK, ApiResponse::ok(form.snapshot())),
        Err(e) => reply::<FormSnapshot>(StatusCode::BAD_REQUEST, ApiResponse::err(e.to_string())),
    }
}

/// Build the full router
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(list_categories))
        .route("/categories/:name", get(get_category))
        .route("/form", get(get_form).post(update_form))
        .route("/index-rate/fetch", post(fetch_index_rate))
        .route("/estimate", get(estimate))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
