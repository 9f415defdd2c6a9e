//! REST API endpoints for the gateway

pub mod contact;
pub mod group;
pub mod health;
pub mod message;
pub mod models;

use axum::Router;
use std::sync::Arc;

use crate::state::GatewayState;

/// Create all authenticated REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(message::create_message_routes())
        .merge(contact::create_contact_routes())
        .merge(group::create_group_routes())
}
