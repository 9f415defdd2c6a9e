//! Shared application state for the gateway

use std::sync::Arc;

use courier_chats::{BroadcastHub, ChatServices};
use courier_config::AuthConfig;

use crate::auth::TokenVerifier;

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    /// Chat domain services
    pub services: ChatServices,
    /// Local notification fabric that WebSocket connections subscribe to
    pub hub: BroadcastHub,
    pub tokens: Arc<TokenVerifier>,
    /// Cookie checked for a token when no Authorization header is sent
    pub cookie_name: String,
}

impl GatewayState {
    pub fn new(services: ChatServices, hub: BroadcastHub, auth: &AuthConfig) -> Self {
        Self {
            services,
            hub,
            tokens: Arc::new(TokenVerifier::new(&auth.jwt_secret)),
            cookie_name: auth.cookie_name.clone(),
        }
    }
}
