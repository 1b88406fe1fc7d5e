use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Decision components.
pub mod gate;
pub mod paths;
pub mod svg;

// Collaborators consumed by the session gate.
pub mod navigation;
pub mod session;

// Service plumbing.
pub mod auth;
pub mod config;
pub mod diagram_cache;
pub mod error;
pub mod handlers;
pub mod models;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use diagram_cache::{DiagramCache, DiagramCacheState};
pub use gate::{GateHandle, SessionGate};
pub use navigation::{HistoryNavigator, Navigator, NavigatorState};
pub use session::{MockSessionProvider, SessionProvider, SessionProviderState, SupabaseSessionProvider};

/// ApiDoc
///
/// OpenAPI document for the HTTP surface, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::validate_svg, handlers::validate_svg_data_url, handlers::sanitize_svg,
        handlers::route_check, handlers::get_diagram, handlers::store_diagram,
        handlers::get_diagram_cache_stats, handlers::clear_diagram_cache
    ),
    components(
        schemas(
            models::SvgValidationResult, models::ValidateSvgRequest,
            models::ValidateDataUrlRequest, models::SanitizedSvgResponse,
            models::RouteCheckResponse, models::GateAction, models::Role,
            models::Diagram, models::StoreDiagramResponse, models::DiagramCacheStats,
        )
    ),
    tags(
        (name = "quest-portal", description = "Learning platform session and diagram gates")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for everything handlers need.
#[derive(Clone)]
pub struct AppState {
    /// Configuration: loaded once at startup.
    pub config: AppConfig,
    /// Bounded cache of validated diagrams.
    pub diagrams: DiagramCacheState,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let diagrams = DiagramCache::new(config.diagram_cache_capacity);
        Self {
            config,
            diagrams: Arc::new(diagrams),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for DiagramCacheState {
    fn from_ref(app_state: &AppState) -> DiagramCacheState {
        app_state.diagrams.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, scoped middleware, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: any origin, method and header.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routing tree
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Diagram writes need a verified bearer token.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Role check for '/admin' lives in the handlers.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    // 3. Correlation and tracing, outermost first.
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Stamp a UUID on requests that arrive without one.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request, tagged with that id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the id back to the caller.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS wraps everything.
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`; tags every request span with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // Fields shared by every log line emitted inside the request.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
