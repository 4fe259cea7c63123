//! # Broker Authorization Management Server
//!
//! HTTP management API over the broker access-control core. Authentication
//! happens upstream; the authenticated principal arrives in the
//! `x-broker-principal` header.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//! - `POST /v1/check` - Scope and/or resource check
//! - `GET /v1/scopes`, `GET /v1/scopes/:name`
//! - `POST /v1/scopes/:name/groups`, `DELETE /v1/scopes/:name/groups/:group`
//! - `POST|GET|DELETE /v1/resources/:type/:name`
//! - `POST /v1/resources/:type/:name/actions/:action/groups`
//! - `DELETE /v1/resources/:type/:name/actions/:action/groups/:group`
//! - `PUT /v1/resources/:type/:name/owner`
//!
//! ## Configuration
//!
//! See `broker_authz::config` for the `BROKER_AUTHZ_*` variables.
//! `RUST_LOG` sets the log level (default: info).

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    serve, Router,
};
use broker_authz::{
    AuthConfig, AuthManager, AuthResource, AuthScope, AuthorizationHandler, AuthzError,
    ErrorKind, Principal, ResourceAction, ResourceAuthScope, ResourceType, StoreError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PRINCIPAL_HEADER: &str = "x-broker-principal";

/// Shared application state
#[derive(Clone)]
struct AppState {
    manager: Arc<AuthManager>,
    start_time: std::time::Instant,
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Application error type
#[derive(Debug)]
enum AppError {
    Authz(AuthzError),
    BadRequest(String),
    Unauthenticated,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                format!("missing {} header", PRINCIPAL_HEADER),
            ),
            AppError::Authz(err) => {
                let (status, error) = match &err {
                    AuthzError::System {
                        source: StoreError::ScopeNotFound(_),
                        ..
                    } => (StatusCode::NOT_FOUND, "scope_not_found"),
                    _ => match err.kind() {
                        ErrorKind::Denial => (StatusCode::FORBIDDEN, "forbidden"),
                        ErrorKind::ResourceNotFound => (StatusCode::NOT_FOUND, "not_found"),
                        ErrorKind::DuplicateResource => (StatusCode::CONFLICT, "duplicate_resource"),
                        ErrorKind::StoreUnavailable => {
                            error!("Authorization system error: {}", err);
                            (StatusCode::INTERNAL_SERVER_ERROR, "authorization_error")
                        }
                    },
                };
                (status, error, err.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        AppError::Authz(err)
    }
}

/// Principal authenticated upstream
struct Caller(Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Caller(Principal::new(name)))
            .ok_or(AppError::Unauthenticated)
    }
}

impl AppState {
    fn handler(&self, caller: Caller) -> AuthorizationHandler {
        self.manager.authorization_handler(caller.0)
    }
}

fn parse<T>(value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| AppError::BadRequest(e.to_string()))
}

/// Authorization check request
#[derive(Debug, Deserialize)]
struct CheckRequest {
    scope: Option<ResourceAuthScope>,
    resource_type: Option<ResourceType>,
    resource_name: Option<String>,
    action: Option<ResourceAction>,
}

/// Authorization check response
#[derive(Debug, Serialize)]
struct CheckResponse {
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CreateResourceRequest {
    #[serde(default)]
    durable: bool,
}

#[derive(Debug, Deserialize)]
struct GroupsRequest {
    groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerRequest {
    owner: String,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    backend: String,
    uptime_seconds: u64,
    version: String,
}

/// Metrics response (Prometheus format)
struct MetricsResponse {
    metrics: String,
}

impl IntoResponse for MetricsResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            self.metrics,
        )
            .into_response()
    }
}

/// POST /v1/check - Check authorization
async fn check_authorization(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    let handler = state.handler(caller);

    let resource = match (req.resource_type, req.resource_name, req.action) {
        (Some(resource_type), Some(name), Some(action)) => Some((resource_type, name, action)),
        (None, None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "resource_type, resource_name and action go together".to_string(),
            ))
        }
    };

    let result = match (req.scope, &resource) {
        (Some(scope), Some((resource_type, name, action))) => {
            handler.handle(scope, *resource_type, name, *action).await
        }
        (Some(scope), None) => handler.handle_scope(scope).await,
        (None, Some((resource_type, name, action))) => {
            handler.handle_resource(*resource_type, name, *action).await
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "nothing to check: give a scope and/or a resource".to_string(),
            ))
        }
    };

    match result {
        Ok(()) => Ok(Json(CheckResponse {
            allowed: true,
            reason: None,
        })),
        Err(err @ AuthzError::Unauthorized(_)) => Ok(Json(CheckResponse {
            allowed: false,
            reason: Some(err.to_string()),
        })),
        Err(err) => Err(err.into()),
    }
}

/// GET /v1/scopes
async fn list_scopes(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<AuthScope>>, AppError> {
    Ok(Json(state.handler(caller).scopes().await?))
}

/// GET /v1/scopes/:name
async fn get_scope(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
) -> Result<Json<AuthScope>, AppError> {
    state
        .handler(caller)
        .scope(&name)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::Authz(AuthzError::System {
                context: format!("reading auth scope key: {}", name),
                source: StoreError::ScopeNotFound(name.clone()),
            })
        })
}

/// POST /v1/scopes/:name/groups
async fn add_scope_groups(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
    Json(req): Json<GroupsRequest>,
) -> Result<StatusCode, AppError> {
    state
        .handler(caller)
        .add_scope_groups(&name, &req.groups)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/scopes/:name/groups/:group
async fn remove_scope_group(
    State(state): State<AppState>,
    caller: Caller,
    Path((name, group)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .handler(caller)
        .remove_scope_group(&name, &group)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/resources/:type/:name - Declare a resource
async fn create_resource(
    State(state): State<AppState>,
    caller: Caller,
    Path((resource_type, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let resource_type: ResourceType = parse(&resource_type)?;
    // An empty body declares a transient resource; a present one must parse
    let req: CreateResourceRequest = if body.is_empty() {
        CreateResourceRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {}", e)))?
    };
    let handler = state.handler(caller);

    handler
        .handle_scope(ResourceAuthScope::create_scope_for(resource_type))
        .await?;
    handler
        .create_auth_resource(resource_type, &name, req.durable)
        .await?;

    info!(principal = %handler.principal(), resource_type = %resource_type, name, "Resource declared");
    Ok(StatusCode::CREATED)
}

/// GET /v1/resources/:type/:name
async fn get_resource(
    State(state): State<AppState>,
    caller: Caller,
    Path((resource_type, name)): Path<(String, String)>,
) -> Result<Json<AuthResource>, AppError> {
    let resource_type: ResourceType = parse(&resource_type)?;
    Ok(Json(
        state
            .handler(caller)
            .auth_resource(resource_type, &name)
            .await?,
    ))
}

/// DELETE /v1/resources/:type/:name
async fn delete_resource(
    State(state): State<AppState>,
    caller: Caller,
    Path((resource_type, name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let resource_type: ResourceType = parse(&resource_type)?;
    let handler = state.handler(caller);

    handler
        .handle(
            ResourceAuthScope::delete_scope_for(resource_type),
            resource_type,
            &name,
            ResourceAction::Delete,
        )
        .await?;
    handler.delete_auth_resource(resource_type, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/resources/:type/:name/actions/:action/groups
async fn grant_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((resource_type, name, action)): Path<(String, String, String)>,
    Json(req): Json<GroupsRequest>,
) -> Result<StatusCode, AppError> {
    let resource_type: ResourceType = parse(&resource_type)?;
    let action: ResourceAction = parse(&action)?;
    state
        .handler(caller)
        .grant_permission(resource_type, &name, action, &req.groups)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/resources/:type/:name/actions/:action/groups/:group
async fn revoke_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((resource_type, name, action, group)): Path<(String, String, String, String)>,
) -> Result<StatusCode, AppError> {
    let resource_type: ResourceType = parse(&resource_type)?;
    let action: ResourceAction = parse(&action)?;
    state
        .handler(caller)
        .revoke_permission(resource_type, &name, action, &group)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/resources/:type/:name/owner
async fn change_owner(
    State(state): State<AppState>,
    caller: Caller,
    Path((resource_type, name)): Path<(String, String)>,
    Json(req): Json<OwnerRequest>,
) -> Result<StatusCode, AppError> {
    let resource_type: ResourceType = parse(&resource_type)?;
    state
        .handler(caller)
        .change_owner(resource_type, &name, &req.owner)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Response {
    let (status_code, status) = match state.manager.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            error!("Permission store health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let body = Json(HealthResponse {
        status: status.to_string(),
        backend: state.manager.backend_name().to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: broker_authz::VERSION.to_string(),
    });
    (status_code, body).into_response()
}

/// GET /metrics - Prometheus metrics endpoint
async fn metrics(State(state): State<AppState>) -> MetricsResponse {
    let decisions = state.manager.metrics().export_prometheus().await;
    let metrics = format!(
        "# HELP broker_authz_uptime_seconds Server uptime in seconds\n\
         # TYPE broker_authz_uptime_seconds gauge\n\
         broker_authz_uptime_seconds {}\n\
         \n\
         {}",
        state.start_time.elapsed().as_secs(),
        decisions
    );

    MetricsResponse { metrics }
}

/// Create the HTTP router with all endpoints
fn create_router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/v1/check", post(check_authorization))
        .route("/v1/scopes", get(list_scopes))
        .route("/v1/scopes/:name", get(get_scope))
        .route("/v1/scopes/:name/groups", post(add_scope_groups))
        .route("/v1/scopes/:name/groups/:group", delete(remove_scope_group))
        .route(
            "/v1/resources/:type/:name",
            post(create_resource).get(get_resource).delete(delete_resource),
        )
        .route(
            "/v1/resources/:type/:name/actions/:action/groups",
            post(grant_permission),
        )
        .route(
            "/v1/resources/:type/:name/actions/:action/groups/:group",
            delete(revoke_permission),
        )
        .route("/v1/resources/:type/:name/owner", put(change_owner))
        .layer(ServiceBuilder::new().layer(trace))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Broker Authorization Server v{}", broker_authz::VERSION);

    let config = AuthConfig::from_env()?;
    info!("Configuration:");
    info!("  Bind address: {}", config.bind_addr);
    info!("  Authorization enabled: {}", config.authorization_enabled);
    info!(
        "  Store: {}",
        if config.database_url.is_some() { "postgres" } else { "memory" }
    );
    info!("  Admin group: {}", config.admin_group);

    let manager = AuthManager::from_config(&config).await.map_err(|e| {
        error!("Failed to initialize authorization: {}", e);
        e
    })?;

    let state = AppState {
        manager: Arc::new(manager),
        start_time: std::time::Instant::now(),
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Starting HTTP server on {}", config.bind_addr);

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}
