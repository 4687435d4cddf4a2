use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::auth::AuthenticatedUser;
use crate::services::notification_service::{self, CreateNotificationRequest, MarkReadRequest};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    responses(
        (status = 200, description = "Unread notifications, newest first", body = Vec<crate::models::Notification>),
        (status = 401, description = "Not signed in")
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_notifications(state: web::Data<AppState>, caller: AuthenticatedUser) -> HttpResponse {
    log::info!("🔔 GET /notifications - caller: {}", caller.user_id());

    match notification_service::list_unread(state.store(), &caller).await {
        Ok(notifications) => HttpResponse::Ok().json(serde_json::json!({ "notifications": notifications })),
        Err(e) => {
            log::error!("❌ Failed to load notifications for {}: {}", caller.user_id(), e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/notifications",
    tag = "Notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = crate::models::Notification),
        (status = 400, description = "Missing connectionId, or type does not match the connection direction"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Recipient not found, or caller not on the connection")
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn create_notification(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    request: web::Json<CreateNotificationRequest>,
) -> HttpResponse {
    log::info!("🔔 POST /notifications - {} → {}", caller.user_id(), request.user_id);

    match notification_service::create(state.store(), &caller, request.into_inner()).await {
        Ok(notification) => HttpResponse::Created().json(serde_json::json!({ "notification": notification })),
        Err(e) => {
            log::warn!("❌ Notification not created: {}", e);
            e.error_response()
        }
    }
}

/// PATCH /notifications/{notification_id} - set the read flag
pub async fn update_notification(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<MarkReadRequest>,
) -> HttpResponse {
    let notification_id = path.into_inner();
    log::info!("🔔 PATCH /notifications/{} - read: {}", notification_id, request.read);

    match notification_service::set_read(state.store(), &caller, &notification_id, request.read).await {
        Ok(notification) => HttpResponse::Ok().json(serde_json::json!({ "notification": notification })),
        Err(e) => {
            log::warn!("❌ Notification {} not updated: {}", notification_id, e);
            e.error_response()
        }
    }
}
