//! HTTP surface of the node.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::error::Error;
use crate::i18n::{
    self, BootstrapLoader, LanguageChange, LanguageLifecycleManager, LanguageRegistry,
};
use crate::node::{self, ConfigAggregator, NodeMemory};
use crate::robots;
use crate::security::check_api_token;

/// Shared state of every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub registry: &'static LanguageRegistry,
    pub appdata: Arc<dyn BootstrapLoader>,
    pub memory: Arc<RwLock<NodeMemory>>,
}

impl AppState {
    /// State for an initialized node database.
    pub fn new(
        config: Arc<Config>,
        db: Database,
        appdata: Arc<dyn BootstrapLoader>,
    ) -> crate::error::Result<Self> {
        let memory = db.transact(|tx| NodeMemory::load(tx, node::VERSION))?;

        Ok(Self {
            config,
            db,
            registry: LanguageRegistry::get(),
            appdata,
            memory: Arc::new(RwLock::new(memory)),
        })
    }

    fn memory(&self) -> Result<NodeMemory, Error> {
        self.memory
            .read()
            .map(|memory| memory.clone())
            .map_err(|_| Error::LockPoisoned)
    }

    fn set_memory(&self, memory: NodeMemory) -> Result<(), Error> {
        *self.memory.write().map_err(|_| Error::LockPoisoned)? = memory;
        Ok(())
    }

    /// The requested locale if enabled, the default one otherwise.
    fn language(&self, requested: Option<&str>) -> Result<String, Error> {
        let memory = self.memory()?;
        Ok(match requested {
            Some(lang) if memory.languages_enabled.iter().any(|l| l == lang) => lang.to_string(),
            _ => memory.default_language,
        })
    }

    fn aggregator(&self, latest_version: String) -> ConfigAggregator<'static> {
        ConfigAggregator::new(self.registry, self.config.static_path(), latest_version)
    }

    fn require_admin(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if check_api_token(headers, self.config.admin_api_token.as_deref()) {
            Ok(())
        } else {
            warn!("Rejected admin request without a valid API token");
            Err(ApiError::Unauthorized)
        }
    }
}

// ==================== Errors ====================

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    Unauthorized,
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub error_message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Core(Error::Validation { .. }) | ApiError::Core(Error::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Core(Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.code(),
            ApiError::Unauthorized => "unauthorized",
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Core(e) if status.is_server_error() => {
                error!("Request failed: {}", e);
                "internal error".to_string()
            }
            ApiError::Core(e) => e.to_string(),
            ApiError::Unauthorized => "missing or invalid API token".to_string(),
        };

        let body = ErrorResponse {
            error_code: self.error_code().to_string(),
            error_message: message,
        };

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn request_object(body: Value) -> Result<Map<String, Value>, Error> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidInput("expected a JSON object".to_string())),
    }
}

// ==================== Routes ====================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/node", get(get_node).put(put_node))
        .route("/api/l10n/:lang", get(get_l10n))
        .route(
            "/api/admin/l10n/:lang",
            get(get_custom_texts)
                .put(put_custom_texts)
                .delete(delete_custom_texts),
        )
        .route("/robots.txt", get(robots_txt))
        .route("/sitemap.xml", get(sitemap_xml))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

async fn get_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LangQuery>,
) -> ApiResult<Json<Map<String, Value>>> {
    state.require_admin(&headers)?;

    let language = state.language(query.lang.as_deref())?;
    let aggregator = state.aggregator(state.memory()?.latest_version);
    let view = state.db.transact(|tx| aggregator.snapshot(tx, &language))?;
    Ok(Json(view))
}

async fn put_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LangQuery>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Map<String, Value>>> {
    state.require_admin(&headers)?;

    let request = request_object(body)?;
    let language = state.language(query.lang.as_deref())?;
    let memory = state.memory()?;
    let latest_version = memory.latest_version;

    // Read the bootstrap data before the database lock is taken; the loader
    // caches it, so the load inside the transaction does no I/O.
    let change = LanguageChange::from_request(&request)?;
    if change.adds_languages(state.registry, &memory.languages_enabled) {
        state.appdata.load()?;
    }

    let lifecycle = LanguageLifecycleManager::new(state.registry, state.appdata.as_ref());
    let aggregator = state.aggregator(latest_version.clone());

    let (view, memory) = state.db.transact(|tx| {
        let view = node::update_node(tx, &lifecycle, &aggregator, &request, &language)?;
        let memory = NodeMemory::load(tx, &latest_version)?;
        Ok((view, memory))
    })?;

    state.set_memory(memory)?;
    info!("Node configuration updated");
    Ok(Json(view))
}

async fn get_l10n(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> ApiResult<Json<Map<String, Value>>> {
    let l10n_path = state.config.l10n_path();
    let texts = state
        .db
        .transact(|tx| i18n::get_l10n(tx, state.registry, &l10n_path, &lang))?;
    Ok(Json(texts))
}

async fn get_custom_texts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lang): Path<String>,
) -> ApiResult<Json<Map<String, Value>>> {
    state.require_admin(&headers)?;
    let texts = state.db.transact(|tx| i18n::get_custom_texts(tx, &lang))?;
    Ok(Json(texts))
}

async fn put_custom_texts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lang): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Map<String, Value>>> {
    state.require_admin(&headers)?;
    let texts = request_object(body)?;
    let merged = state
        .db
        .transact(|tx| i18n::update_custom_texts(tx, state.registry, &lang, texts))?;
    Ok(Json(merged))
}

async fn delete_custom_texts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lang): Path<String>,
) -> ApiResult<StatusCode> {
    state.require_admin(&headers)?;
    state
        .db
        .transact(|tx| i18n::delete_custom_texts(tx, &lang))?;
    Ok(StatusCode::OK)
}

async fn robots_txt(State(state): State<AppState>) -> ApiResult<Response> {
    let body = robots::robots_txt(&state.memory()?);
    Ok(([(header::CONTENT_TYPE, "text/plain")], body).into_response())
}

async fn sitemap_xml(State(state): State<AppState>) -> ApiResult<Response> {
    let body = robots::sitemap_xml(&state.memory()?)?;
    Ok(([(header::CONTENT_TYPE, "text/xml")], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::validation("name", "too long"), StatusCode::BAD_REQUEST),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::not_found("user", "u1"), StatusCode::NOT_FOUND),
            (Error::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::from(Error::InvalidInput("x".into())).error_code(), "invalid_input");
        assert_eq!(ApiError::Unauthorized.error_code(), "unauthorized");
    }

    #[test]
    fn test_request_object() {
        assert!(request_object(serde_json::json!({"a": 1})).is_ok());
        assert!(matches!(
            request_object(serde_json::json!([1])),
            Err(Error::InvalidInput(_))
        ));
    }
}
