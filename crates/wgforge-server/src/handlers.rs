//! HTTP Handlers
//!
//! Config generation, country listing and health endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wgforge_core::{config_file_name, ConfigGenerator, GenerateError, GeneratorOptions, IpRangeTable};

use crate::messages::Locale;
use crate::storage::ConfigStore;

/// Random source usable for key material
pub trait SecureRng: RngCore + CryptoRng {}

impl<T: RngCore + CryptoRng> SecureRng for T {}

/// Hands out a random source for each generated config
pub type RngSource = Arc<dyn Fn() -> Box<dyn SecureRng> + Send + Sync>;

/// The thread-local generator seeded from the OS
pub fn thread_rng_source() -> RngSource {
    Arc::new(|| Box::new(rand::thread_rng()) as Box<dyn SecureRng>)
}

/// Application state shared across handlers
pub struct AppState {
    pub table: IpRangeTable,
    pub options: GeneratorOptions,
    pub store: Arc<dyn ConfigStore>,
    pub locale: Locale,
    pub rng: RngSource,
}

/// Generate request
///
/// `country` stays loosely typed so a non-string value reads as an
/// invalid country rather than a malformed body.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub country: Option<Value>,
}

/// Generate response, success or failure
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    fn ok(config: String, download_url: String) -> Self {
        Self {
            success: true,
            config: Some(config),
            download_url: Some(download_url),
            error: None,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            success: false,
            config: None,
            download_url: None,
            error: Some(message.to_string()),
        }
    }
}

/// Country list response
#[derive(Debug, Serialize)]
pub struct CountriesResponse {
    pub countries: Vec<String>,
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/countries", get(countries_handler))
        .route("/api/generate-config", post(generate_config_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
        )
        .with_state(state)
}

/// Render a config and its file name for `country`
///
/// Kept synchronous so the random source never lives across an await.
fn generate(state: &AppState, country: &str) -> Result<(String, String), GenerateError> {
    let country = state.table.resolve(country)?;
    let generator = ConfigGenerator::with_options(&state.table, state.options);

    let mut rng = (state.rng)();
    let document = generator.generate_for(country, &mut *rng)?;
    let filename = config_file_name(country, &mut *rng);

    Ok((document.to_conf(), filename))
}

/// POST /api/generate-config - Generate and publish a config
///
/// Unknown countries are rejected before anything is generated or stored.
pub async fn generate_config_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> (StatusCode, Json<GenerateResponse>) {
    let locale = state.locale;

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection);
            return (
                StatusCode::BAD_REQUEST,
                Json(GenerateResponse::failed(locale.invalid_request())),
            );
        }
    };

    let country = match request.country {
        Some(Value::String(country)) => country,
        other => {
            tracing::debug!("Rejected country value: {:?}", other);
            return (
                StatusCode::BAD_REQUEST,
                Json(GenerateResponse::failed(locale.invalid_country())),
            );
        }
    };

    let (config, filename) = match generate(&state, &country) {
        Ok(generated) => generated,
        Err(e) if e.is_unknown_country() => {
            tracing::info!("Rejected unknown country: {:?}", country);
            return (
                StatusCode::BAD_REQUEST,
                Json(GenerateResponse::failed(locale.invalid_country())),
            );
        }
        Err(e) => {
            tracing::error!("Config generation failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateResponse::failed(locale.internal_error())),
            );
        }
    };

    match state.store.store(&filename, &config).await {
        Ok(stored) => {
            tracing::info!("Published {} at {}", filename, stored.url);
            (StatusCode::OK, Json(GenerateResponse::ok(config, stored.url)))
        }
        Err(e) => {
            tracing::warn!("Storing {} failed: {}", filename, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(GenerateResponse::failed(locale.store_failed())),
            )
        }
    }
}

/// GET /api/countries - Supported countries
pub async fn countries_handler(State(state): State<Arc<AppState>>) -> Json<CountriesResponse> {
    Json(CountriesResponse {
        countries: state
            .table
            .country_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
