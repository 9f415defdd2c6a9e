//! Group chat endpoints

use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};
use std::sync::Arc;

use crate::auth::CallerId;
use crate::error::{ErrorResponse, GatewayResult};
use crate::rest::models::{ChatResponse, CreateGroupRequest};
use crate::state::GatewayState;

/// Create group routes
pub fn create_group_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/api/groups", post(create_group))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "Groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created with the caller as admin", body = ChatResponse),
        (status = 400, description = "Missing name or too few members", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_group(
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(caller)): Extension<CallerId>,
    Json(request): Json<CreateGroupRequest>,
) -> GatewayResult<(StatusCode, Json<ChatResponse>)> {
    let chat = state
        .services
        .chats
        .create_group(&caller, &request.name, &request.users)
        .await?;

    Ok((StatusCode::CREATED, Json(chat.into())))
}
