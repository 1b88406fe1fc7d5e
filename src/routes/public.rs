use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The SVG functions are stateless and
/// always answer with a verdict body; `/route-check` reads an optional bearer token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /svg/validate
        // Structural and security checks on raw SVG markup.
        .route("/svg/validate", post(handlers::validate_svg))
        // POST /svg/validate-data-url
        // Same checks after decoding a base64 or percent-encoded data URL.
        .route("/svg/validate-data-url", post(handlers::validate_svg_data_url))
        // POST /svg/sanitize
        // Best-effort stripping of active content; not a security boundary.
        .route("/svg/sanitize", post(handlers::sanitize_svg))
        // GET /route-check?path=...
        // Mount-time redirect decision for the caller's session.
        .route("/route-check", get(handlers::route_check))
        // GET /diagrams/{key}
        // Reads a previously validated diagram from the cache.
        .route("/diagrams/{key}", get(handlers::get_diagram))
}
