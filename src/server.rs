//! HTTP boundary for password derivation.
//!
//! `POST /api/password` takes `{ "entropy": <base64>, "settings": {...} }`
//! and answers `{ "password": ... }` or `{ "error": ... }`.

use crate::charset::CategorySet;
use crate::config::ServerConfig;
use crate::error::Error;
use crate::generator::generate_password;
use crate::seed::Seed;
use crate::settings::{DEFAULT_LENGTH, Settings};
use axum::BoxError;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use zeroize::Zeroizing;

#[derive(Deserialize)]
pub struct DeriveRequest {
    pub entropy: String,
    #[serde(default)]
    pub settings: SettingsPayload,
}

/// Wire form of [`Settings`]. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPayload {
    pub length: i64,
    pub include_lowercase: bool,
    pub include_uppercase: bool,
    pub include_numbers: bool,
    pub include_symbols: bool,
    pub include_extended_latin: bool,
    pub custom_characters: String,
    pub require_each_selected: bool,
}

impl Default for SettingsPayload {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH as i64,
            include_lowercase: false,
            include_uppercase: false,
            include_numbers: false,
            include_symbols: false,
            include_extended_latin: false,
            custom_characters: String::new(),
            require_each_selected: false,
        }
    }
}

impl From<SettingsPayload> for Settings {
    fn from(payload: SettingsPayload) -> Self {
        let mut categories = CategorySet::empty();
        categories.set(CategorySet::LOWERCASE, payload.include_lowercase);
        categories.set(CategorySet::UPPERCASE, payload.include_uppercase);
        categories.set(CategorySet::NUMBERS, payload.include_numbers);
        categories.set(CategorySet::SYMBOLS, payload.include_symbols);
        categories.set(CategorySet::EXTENDED_LATIN, payload.include_extended_latin);

        Settings {
            length: Settings::clamp_length(payload.length),
            categories,
            custom_characters: payload.custom_characters,
            require_each_selected: payload.require_each_selected,
        }
    }
}

#[derive(Serialize)]
struct PasswordResponse<'a> {
    password: &'a str,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::InvalidSettings(_)
            | Error::InvalidSeed(_)
            | Error::MalformedSample { .. }
            | Error::SampleCount { .. } => StatusCode::BAD_REQUEST,
            Error::CoverageUnsatisfiable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotCollecting | Error::ExpanderExhausted => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn api_password(
    payload: Result<Json<DeriveRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let entropy = Zeroizing::new(request.entropy);
    let seed = Seed::from_base64(&entropy)?;
    let settings = Settings::from(request.settings);

    let derived = tokio::task::spawn_blocking(move || generate_password(&seed, &settings))
        .await
        .map_err(|e| ApiError::internal(format!("Derivation task failed: {}", e)))?;

    match derived {
        Ok(password) => Ok(Json(PasswordResponse {
            password: &password,
        })
        .into_response()),
        Err(err) => {
            warn!(error = %err, "password derivation rejected");
            Err(err.into())
        }
    }
}

async fn handle_layer_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        warn!("request timed out");
        ApiError {
            status: StatusCode::REQUEST_TIMEOUT,
            message: "Request timed out".into(),
        }
    } else {
        ApiError::internal(format!("Unhandled middleware error: {}", err))
    }
}

async fn api_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn router(config: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/api/password", post(api_password))
        .route("/api/health", get(api_health));
    with_layers(routes, config)
}

/// Body limit, timeout with a JSON 408, and request tracing.
fn with_layers(routes: Router, config: &ServerConfig) -> Router {
    routes
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(config.timeout())),
        )
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    let app = router(&config);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        addr = %config.bind,
        body_limit = config.body_limit,
        timeout_secs = config.timeout_secs,
        "jitterpass listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
