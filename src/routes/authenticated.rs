use crate::{AppState, handlers};
use axum::{Router, routing::put};

/// Authenticated Router Module
///
/// Routes that need a signed-in caller. The `auth_middleware` layer applied in
/// `create_router` rejects anonymous requests before they reach a handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // PUT /diagrams/{key}
        // Sanitizes, validates and caches a generated diagram. Invalid markup is
        // answered with 422 and never cached.
        .route("/diagrams/{key}", put(handlers::store_diagram))
}
