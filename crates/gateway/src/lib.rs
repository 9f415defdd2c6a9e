//! # Courier Gateway Crate
//!
//! HTTP and WebSocket surface of Courier. Requests are authenticated with a bearer
//! token and routed to the chat services; connected sockets receive the
//! notifications published on their user and group channels.
//!
//! ## Architecture
//!
//! - **REST**: message, contact and group endpoints with OpenAPI documentation
//! - **WebSocket**: per-connection channel subscriptions fed by the notification hub
//! - **State**: services, hub and token verifier shared by every handler
//! - **Middleware**: authentication, CORS and request logging
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn run(state: courier_gateway::GatewayState) -> std::io::Result<()> {
//! let app = courier_gateway::create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await
//! # }
//! ```

pub mod auth;
pub mod docs;
pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use auth::{CallerId, Claims, TokenVerifier};
pub use error::{GatewayError, GatewayResult};
pub use middleware::auth_middleware;
pub use state::GatewayState;

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);

    let protected = rest::create_rest_routes()
        .merge(websocket::create_websocket_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .route("/health", get(rest::health::health_check))
        .merge(protected)
        .with_state(state)
        // credentials stay off: a wildcard origin cannot be combined with them
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    #[cfg(debug_assertions)]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        );
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = docs::ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for path in [
            "/health",
            "/api/messages",
            "/api/messages/{target}",
            "/api/messages/seen/{receiver}",
            "/api/contacts",
            "/api/groups",
        ] {
            assert!(paths.iter().any(|candidate| candidate.as_str() == path), "{path}");
        }
        assert!(doc
            .components
            .unwrap()
            .security_schemes
            .contains_key("bearerAuth"));
    }
}
