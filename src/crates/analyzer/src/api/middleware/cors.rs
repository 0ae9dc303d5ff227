//! CORS middleware configuration

use tower_http::cors::CorsLayer;

/// Permissive CORS for the browser front end; the `/analyze*` routes are
/// still guarded by caller identity and the security middleware.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
