use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Cache oversight for the 'admin' role. The role check happens inside each
/// handler after the `AuthUser` extractor has authenticated the caller.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/diagram-cache
        // Entry count, capacity and evictions so far.
        // DELETE /admin/diagram-cache
        // Drops every cached diagram.
        .route(
            "/diagram-cache",
            get(handlers::get_diagram_cache_stats).delete(handlers::clear_diagram_cache),
        )
}
