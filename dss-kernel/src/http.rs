/**
 * API REST DSS - Serveur HTTP principal du kernel
 *
 * RÔLE :
 * Expose les jeux de données du tableau de bord et le panneau d'intégration
 * (registre des sources, test de connexion, sync, lecture distante).
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, routes /health, /system, /api/data, /api/sources, /api/integration
 * - Erreurs rendues en {"error": "..."} avec le statut HTTP correspondant
 * - Les 500 ne divulguent jamais le détail de l'erreur (log seulement)
 *
 * SÉCURITÉ :
 * - Header x-api-key exigé sur toutes routes sauf /health* quand une clé est configurée
 * - Sans clé configurée, l'API est ouverte
 */

use crate::config::KernelConfig;
use crate::datasets::{DatasetError, DatasetKind, DatasetStore, StaticDatasets};
use crate::guide::{notebook_guide, IntegrationGuide};
use crate::health::{HealthTracker, KernelHealth};
use crate::integration::{IntegrationError, IntegrationService, SyncOutcome};
use crate::registry::{RegistryError, RegistrySummary, SourceRegistry};
use crate::sources::{DataSource, SourceConfig};
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

impl From<IntegrationError> for ApiError {
    fn from(e: IntegrationError) -> Self {
        match e {
            IntegrationError::UnsupportedKind(_) | IntegrationError::InvalidEndpoint { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            IntegrationError::Remote { .. } | IntegrationError::Transport { .. } => {
                ApiError::BadGateway(e.to_string())
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SourceRegistry>,
    pub datasets: Arc<dyn DatasetStore>,
    pub integration: IntegrationService,
    pub health_tracker: HealthTracker,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(registry: SourceRegistry, datasets: impl DatasetStore + 'static) -> Self {
        Self {
            registry: Arc::new(registry),
            datasets: Arc::new(datasets),
            integration: IntegrationService::new(),
            health_tracker: HealthTracker::new(),
            api_key: None,
        }
    }

    /// Registre et jeux de données échantillons
    pub fn sample() -> Self {
        Self::new(SourceRegistry::sample(), StaticDatasets::default())
    }

    pub fn from_config(cfg: &KernelConfig) -> Result<Self, RegistryError> {
        let registry = match &cfg.sources {
            Some(sources) => SourceRegistry::new(sources.clone())?,
            None => SourceRegistry::sample(),
        };
        let datasets = cfg.datasets.clone().unwrap_or_default();
        Ok(Self::new(registry, datasets).with_api_key(cfg.api_key.clone()))
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn source(&self, id: &str) -> Result<&DataSource, ApiError> {
        self.registry
            .get(id)
            .ok_or_else(|| ApiError::NotFound(format!("unknown source: {id}")))
    }
}

async fn require_api_key(
    State(app): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Health check toujours accessible
    if req.uri().path().starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let Some(expected) = app.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        warn!("[http] rejected request without valid x-api-key on {}", req.uri().path());
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/data", get(get_data).post(post_data))
        .route("/api/sources", get(list_sources))
        .route("/api/sources/{id}", get(get_source))
        .route("/api/sources/{id}/test", post(test_source))
        .route("/api/sources/{id}/sync", post(sync_source))
        .route("/api/sources/{id}/fetch", post(fetch_source))
        .route("/api/integration/guide", get(get_guide))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_api_key))
        .with_state(app_state)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.registry))
}

// GET /api/data?type=kpis|projects|clients|service-areas
async fn get_data(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let raw = params
        .get("type")
        .ok_or_else(|| ApiError::BadRequest("missing `type` query parameter".into()))?;
    let kind: DatasetKind =
        raw.parse().map_err(|e: DatasetError| ApiError::BadRequest(e.to_string()))?;

    match app.datasets.document(kind) {
        Ok(doc) => Ok(Json(doc)),
        Err(e) => {
            error!("[http] dataset {} failed: {e}", kind.as_str());
            Err(ApiError::Internal("internal server error"))
        }
    }
}

#[derive(Debug, Serialize)]
struct IngestAck {
    success: bool,
    message: String,
    timestamp: String,
}

// POST /api/data  {type, payload}
async fn post_data(body: Bytes) -> Result<Json<IngestAck>, ApiError> {
    let data: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        warn!("[http] unparseable ingest body: {e}");
        ApiError::Internal("error processing data")
    })?;

    let kind = match data.get("type") {
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => "unknown".to_string(),
    };
    let payload = data.get("payload").cloned().unwrap_or(serde_json::Value::Null);
    info!("[http] received {kind} data: {payload}");

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|_| ApiError::Internal("error processing data"))?;

    Ok(Json(IngestAck {
        success: true,
        message: format!("{kind} data received successfully"),
        timestamp,
    }))
}

#[derive(Debug, Serialize)]
struct SourcesView<'a> {
    sources: &'a [DataSource],
    summary: RegistrySummary,
}

// GET /api/sources
async fn list_sources(State(app): State<AppState>) -> Response {
    let view = SourcesView { sources: app.registry.list(), summary: app.registry.summary() };
    Json(view).into_response()
}

// GET /api/sources/{id}
async fn get_source(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataSource>, ApiError> {
    Ok(Json(app.source(&id)?.clone()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestConnectionView {
    source_id: String,
    reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

// POST /api/sources/{id}/test
async fn test_source(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TestConnectionView>, ApiError> {
    let source = app.source(&id)?;
    let result = app.integration.test_connection(source).await;
    Ok(Json(TestConnectionView {
        source_id: id,
        reachable: result.is_reachable(),
        reason: result.reason().map(ToString::to_string),
    }))
}

// POST /api/sources/{id}/sync
async fn sync_source(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SyncOutcome>, ApiError> {
    let source = app.source(&id)?;
    Ok(Json(app.integration.sync_source(source)))
}

// POST /api/sources/{id}/fetch?endpoint=/path  ou  ?dataset=kpis (app notebook)
async fn fetch_source(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source = app.source(&id)?;

    let endpoint = match (params.get("endpoint"), params.get("dataset"), &source.config) {
        (Some(endpoint), _, _) if endpoint.starts_with('/') => endpoint.clone(),
        (Some(endpoint), _, _) => {
            warn!("[http] fetch on {id} refused, endpoint {endpoint:?} is not an absolute path");
            return Err(ApiError::BadRequest("`endpoint` must start with '/'".into()));
        }
        (None, Some(dataset), SourceConfig::NotebookApp(cfg)) => {
            let kind: DatasetKind =
                dataset.parse().map_err(|e: DatasetError| ApiError::BadRequest(e.to_string()))?;
            cfg.endpoints.path_for(kind).to_string()
        }
        (None, Some(_), _) => {
            let msg = "`dataset` is only supported for notebook-app sources";
            return Err(ApiError::BadRequest(msg.into()));
        }
        (None, None, _) => {
            return Err(ApiError::BadRequest("missing `endpoint` query parameter".into()));
        }
    };

    let body = app.integration.fetch_from_source(source, &endpoint).await?;
    Ok(Json(body))
}

// GET /api/integration/guide
async fn get_guide() -> Json<IntegrationGuide> {
    Json(notebook_guide())
}
