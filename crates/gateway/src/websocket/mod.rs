//! WebSocket endpoint delivering notifications to connected clients

mod connection;

pub use connection::{ClientEvent, ServerEvent};

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::auth::CallerId;
use crate::state::GatewayState;

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(websocket_handler))
}

/// Upgrade an authenticated request. The socket is subscribed to the caller's user
/// channel and to every group the caller belongs to.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> Response {
    info!(user_id = %user_id, "websocket upgrade");
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state, user_id))
}
