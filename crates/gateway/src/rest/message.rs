//! Message REST endpoints

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use courier_chats::{MediaKind, MediaUpload, OutgoingMessage};
use std::sync::Arc;
use tracing::debug;

use crate::auth::CallerId;
use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::rest::models::{
    HistoryQuery, HistoryResponse, MessageResponse, SeenResponse, SendMessageForm,
};
use crate::state::GatewayState;

/// Upper bound on a whole multipart message, attachments included
const MAX_MESSAGE_BYTES: usize = 25 * 1024 * 1024;

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/api/messages",
            post(send_message).layer(DefaultBodyLimit::max(MAX_MESSAGE_BYTES)),
        )
        .route("/api/messages/:target", get(list_messages))
        .route("/api/messages/seen/:receiver", put(mark_seen))
}

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    request_body(content = SendMessageForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Message stored and announced", body = MessageResponse),
        (status = 400, description = "Empty message or missing receiver", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Attachment upload failed", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn send_message(
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(caller)): Extension<CallerId>,
    mut multipart: Multipart,
) -> GatewayResult<(StatusCode, Json<MessageResponse>)> {
    let mut receiver = None;
    let mut outgoing = OutgoingMessage::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "receiver" => receiver = Some(field.text().await?),
            "message" => outgoing.text = Some(field.text().await?),
            "gif" => outgoing.gif = Some(field.text().await?),
            "image" | "audio" | "video" => {
                let kind = match name.as_str() {
                    "image" => MediaKind::Image,
                    "audio" => MediaKind::Audio,
                    _ => MediaKind::Video,
                };
                let file_name = field.file_name().unwrap_or(name.as_str()).to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    outgoing.uploads.push(MediaUpload {
                        kind,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let receiver = receiver
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("receiver is required".to_string()))?;

    let message = state
        .services
        .messages
        .send(&caller, receiver.trim(), outgoing)
        .await?;

    Ok((StatusCode::CREATED, Json(message.into())))
}

#[utoipa::path(
    get,
    path = "/api/messages/{target}",
    tag = "Messages",
    params(
        ("target" = String, Path, description = "Chat id, or the other participant's user id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "One page of history, newest first", body = HistoryResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No conversation with this target", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_messages(
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(caller)): Extension<CallerId>,
    Path(target): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> GatewayResult<Json<HistoryResponse>> {
    let page = state
        .services
        .messages
        .page(&target, &caller, query.page.unwrap_or(0))
        .await?;

    Ok(Json(page.into()))
}

#[utoipa::path(
    put,
    path = "/api/messages/seen/{receiver}",
    tag = "Messages",
    params(
        ("receiver" = String, Path, description = "User whose direct chat with the caller is marked seen")
    ),
    responses(
        (status = 200, description = "Messages marked seen", body = SeenResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No direct chat between the two users", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn mark_seen(
    State(state): State<Arc<GatewayState>>,
    Extension(CallerId(caller)): Extension<CallerId>,
    Path(receiver): Path<String>,
) -> GatewayResult<Json<SeenResponse>> {
    let updated = state.services.seen.mark_seen(&receiver, &caller).await?;
    Ok(Json(SeenResponse { updated }))
}
