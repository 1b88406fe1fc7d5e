use crate::{
    AppState,
    auth::{AuthUser, CurrentSession},
    gate::policy,
    models::{
        Diagram, DiagramCacheStats, Role, RouteCheckResponse, SanitizedSvgResponse,
        StoreDiagramResponse, SvgValidationResult, ValidateDataUrlRequest, ValidateSvgRequest,
    },
    paths, svg,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

const MAX_DIAGRAM_KEY_LEN: usize = 128;

// --- Query Structs ---

/// RouteCheckQuery
///
/// Query parameters for GET /route-check.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct RouteCheckQuery {
    /// Application path to evaluate, e.g. `/student/quests`.
    pub path: String,
}

// --- Handlers ---

/// validate_svg
///
/// [Public Route] Runs the SVG content gate over raw markup. Always 200: the verdict
/// is in the body and callers must not render when `is_valid` is false.
#[utoipa::path(
    post,
    path = "/svg/validate",
    request_body = ValidateSvgRequest,
    responses((status = 200, description = "Validation verdict", body = SvgValidationResult))
)]
pub async fn validate_svg(Json(payload): Json<ValidateSvgRequest>) -> Json<SvgValidationResult> {
    Json(svg::validate(&payload.svg))
}

/// validate_svg_data_url
///
/// [Public Route] Decodes a `data:image/svg+xml` URL and validates its payload.
#[utoipa::path(
    post,
    path = "/svg/validate-data-url",
    request_body = ValidateDataUrlRequest,
    responses((status = 200, description = "Validation verdict", body = SvgValidationResult))
)]
pub async fn validate_svg_data_url(
    Json(payload): Json<ValidateDataUrlRequest>,
) -> Json<SvgValidationResult> {
    Json(svg::validate_data_url(&payload.data_url))
}

/// sanitize_svg
///
/// [Public Route] Best-effort removal of scripts, event handlers and `javascript:`
/// URLs. The output still has to pass validation before display.
#[utoipa::path(
    post,
    path = "/svg/sanitize",
    request_body = ValidateSvgRequest,
    responses((status = 200, description = "Sanitized markup", body = SanitizedSvgResponse))
)]
pub async fn sanitize_svg(Json(payload): Json<ValidateSvgRequest>) -> Json<SanitizedSvgResponse> {
    Json(SanitizedSvgResponse {
        svg: svg::sanitize(&payload.svg),
    })
}

/// route_check
///
/// [Public Route] Reports how the mount-time session check treats `path` for the
/// caller's session (anonymous without a bearer token).
#[utoipa::path(
    get,
    path = "/route-check",
    params(RouteCheckQuery),
    responses(
        (status = 200, description = "Gate decision", body = RouteCheckResponse),
        (status = 400, description = "Path is not absolute"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn route_check(
    CurrentSession(session): CurrentSession,
    Query(query): Query<RouteCheckQuery>,
) -> Result<Json<RouteCheckResponse>, StatusCode> {
    if !query.path.starts_with('/') {
        return Err(StatusCode::BAD_REQUEST);
    }

    let class = paths::classify(&query.path);
    let action = policy::initial_action(&query.path, &session);

    Ok(Json(RouteCheckResponse {
        path: query.path,
        is_public: class.is_public,
        is_verify_email_route: class.is_verify_email_route,
        action,
    }))
}

/// get_diagram
///
/// [Public Route] Returns a cached diagram. Only diagrams that passed validation
/// are ever cached.
#[utoipa::path(
    get,
    path = "/diagrams/{key}",
    params(("key" = String, Path, description = "Diagram key")),
    responses(
        (status = 200, description = "Found", body = Diagram),
        (status = 404, description = "Not cached")
    )
)]
pub async fn get_diagram(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Diagram>, StatusCode> {
    state.diagrams.get(&key).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// store_diagram
///
/// [Authenticated Route] Sanitizes, validates and caches a generated diagram.
/// An invalid diagram is not cached and is answered with 422 and the verdict.
#[utoipa::path(
    put,
    path = "/diagrams/{key}",
    params(("key" = String, Path, description = "Diagram key")),
    request_body = ValidateSvgRequest,
    responses(
        (status = 201, description = "Stored", body = StoreDiagramResponse),
        (status = 400, description = "Bad key"),
        (status = 422, description = "Rejected by validation", body = StoreDiagramResponse)
    )
)]
pub async fn store_diagram(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<ValidateSvgRequest>,
) -> Result<(StatusCode, Json<StoreDiagramResponse>), StatusCode> {
    if !is_valid_key(&key) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let sanitized = svg::sanitize(&payload.svg);
    let validation = svg::validate(&sanitized);

    if !validation.is_valid() {
        tracing::info!(key = %key, errors = ?validation.errors(), "diagram rejected");
        let body = StoreDiagramResponse {
            key,
            stored: false,
            validation,
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)));
    }

    state.diagrams.insert(Diagram {
        key: key.clone(),
        svg: sanitized,
        warnings: validation.warnings().to_vec(),
        stored_by: id,
        stored_at: Utc::now(),
    });

    Ok((
        StatusCode::CREATED,
        Json(StoreDiagramResponse {
            key,
            stored: true,
            validation,
        }),
    ))
}

/// get_diagram_cache_stats
///
/// [Admin Route] Size, capacity and eviction count of the diagram cache.
///
/// *Authorization*: Explicitly checks that the `role` is admin.
#[utoipa::path(
    get,
    path = "/admin/diagram-cache",
    responses(
        (status = 200, description = "Stats", body = DiagramCacheStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_diagram_cache_stats(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DiagramCacheStats>, StatusCode> {
    if role != Role::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.diagrams.stats()))
}

/// clear_diagram_cache
///
/// [Admin Route] Empties the diagram cache.
#[utoipa::path(
    delete,
    path = "/admin/diagram-cache",
    responses(
        (status = 204, description = "Cleared"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn clear_diagram_cache(
    AuthUser { role, id, .. }: AuthUser,
    State(state): State<AppState>,
) -> StatusCode {
    if role != Role::Admin {
        return StatusCode::FORBIDDEN;
    }
    tracing::info!(admin = %id, cleared = state.diagrams.len(), "diagram cache cleared");
    state.diagrams.clear();
    StatusCode::NO_CONTENT
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_DIAGRAM_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
