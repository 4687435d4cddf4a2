use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::auth::AuthenticatedUser;
use crate::services::user_service::{self, UpdateProfileRequest};
use crate::state::AppState;

/// GET /users - everyone except the caller
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "Other users", body = Vec<crate::models::UserListItem>),
        (status = 401, description = "Not signed in")
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(state: web::Data<AppState>, caller: AuthenticatedUser) -> HttpResponse {
    log::info!("👥 GET /users - caller: {}", caller.user_id());

    match user_service::list_other_users(state.store(), &caller).await {
        Ok(users) => HttpResponse::Ok().json(serde_json::json!({ "users": users })),
        Err(e) => {
            log::error!("❌ Failed to list users: {}", e);
            e.error_response()
        }
    }
}

/// GET /profile/{user_id} - public profile
pub async fn get_profile(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("👤 GET /profile/{}", user_id);

    match user_service::get_profile(state.store(), &user_id).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => {
            log::warn!("❌ Profile {} unavailable: {}", user_id, e);
            e.error_response()
        }
    }
}

/// PUT /profile/{user_id} - edit own profile
pub async fn update_profile(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("✏️  PUT /profile/{} - caller: {}", user_id, caller.user_id());

    match user_service::update_profile(state.store(), &caller, &user_id, request.into_inner()).await {
        Ok(profile) => HttpResponse::Ok().json(serde_json::json!({ "user": profile })),
        Err(e) => {
            log::warn!("❌ Profile update failed for {}: {}", user_id, e);
            e.error_response()
        }
    }
}
