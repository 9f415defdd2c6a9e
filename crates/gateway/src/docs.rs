use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::message::send_message,
        crate::rest::message::list_messages,
        crate::rest::message::mark_seen,
        crate::rest::contact::list_contacts,
        crate::rest::contact::create_contact,
        crate::rest::group::create_group
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::rest::health::HealthResponse,
            crate::rest::models::UserResponse,
            crate::rest::models::ChatResponse,
            crate::rest::models::MessageResponse,
            crate::rest::models::HistoryMessageResponse,
            crate::rest::models::HistoryResponse,
            crate::rest::models::HistoryQuery,
            crate::rest::models::SeenResponse,
            crate::rest::models::ContactEntryResponse,
            crate::rest::models::CreateContactRequest,
            crate::rest::models::CreateGroupRequest,
            crate::rest::models::SendMessageForm
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Messages", description = "Sending, paging and acknowledging messages"),
        (name = "Contacts", description = "Direct-chat peers and groups of the caller"),
        (name = "Groups", description = "Group chat creation")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("JWT".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
