use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mentor Match API",
        version = "1.0.0",
        description = "Pairs mentors with mentees.\n\n**Authentication:** `POST /login` sets an HttpOnly `token` cookie. API clients may send the same JWT as a Bearer token.\n\n**Real-time:** `GET /socket` upgrades to a WebSocket. Send `{\"event\":\"join\",\"data\":{\"userId\":\"<your id>\"}}` to receive `connection_update` and `connection_accepted` events."
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::logout,

        // Users & matching
        crate::api::users::list_users,
        crate::api::matches::get_matches,

        // Connections
        crate::api::connections::list_connections,
        crate::api::connections::list_accepted,
        crate::api::connections::request_connection,

        // Notifications
        crate::api::notifications::list_notifications,
        crate::api::notifications::create_notification,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::connection_service::ConnectionRequest,
            crate::services::connection_service::UpdateConnectionRequest,
            crate::services::notification_service::CreateNotificationRequest,
            crate::services::notification_service::MarkReadRequest,
            crate::services::user_service::UpdateProfileRequest,
            crate::services::match_service::MatchResult,
            crate::models::Role,
            crate::models::UserInfo,
            crate::models::UserSummary,
            crate::models::UserListItem,
            crate::models::PublicProfile,
            crate::models::Connection,
            crate::models::ConnectionStatus,
            crate::models::ConnectionEdge,
            crate::models::AcceptedConnection,
            crate::models::Notification,
            crate::models::NotificationKind,
            crate::utils::tags::TagInput,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration and cookie sessions."),
        (name = "Users", description = "User directory."),
        (name = "Matches", description = "Mentor/mentee candidates scored by skill and interest overlap."),
        (name = "Connections", description = "Connection requests and their lifecycle."),
        (name = "Notifications", description = "Per-user notification inbox."),
        (name = "Health", description = "Liveness."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::middleware::auth::SESSION_COOKIE,
                ))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session JWT"))
                        .build(),
                ),
            );
        }
    }
}
