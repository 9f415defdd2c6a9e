//! Contact directory endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::auth::CallerId;
use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::rest::models::{ChatResponse, ContactEntryResponse, CreateContactRequest};
use crate::state::GatewayState;

/// Create contact routes
pub fn create_contact_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/api/contacts", get(list_contacts).post(create_contact))
}

#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contacts",
    responses(
        (status = 200, description = "Direct-chat peers followed by groups", body = Vec<ContactEntryResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_contacts(
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(caller)): Extension<CallerId>,
) -> GatewayResult<Json<Vec<ContactEntryResponse>>> {
    let contacts = state.services.contacts.contacts(&caller).await?;
    Ok(Json(contacts.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "Contacts",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Direct chat with the receiver", body = ChatResponse),
        (status = 400, description = "Invalid receiver", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_contact(
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(caller)): Extension<CallerId>,
    Json(request): Json<CreateContactRequest>,
) -> GatewayResult<(StatusCode, Json<ChatResponse>)> {
    let receiver = request.receiver.trim();
    if receiver.is_empty() {
        return Err(GatewayError::InvalidRequest("receiver is required".to_string()));
    }

    let chat = state.services.chats.create_contact(&caller, receiver).await?;
    Ok((StatusCode::CREATED, Json(chat.into())))
}
