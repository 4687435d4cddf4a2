use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    web, HttpResponse, ResponseError,
};

use crate::middleware::auth::SESSION_COOKIE;
use crate::services::auth_service::{self, AuthResponse, LoginRequest, RegisterRequest};
use crate::state::AppState;

fn session_cookie(token: String, secure: bool, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::hours(ttl_hours))
        .finish()
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or email already registered")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    let email = request.email.clone();
    log::info!("📝 POST /register - email: {}", email);

    match auth_service::register(state.store(), &state.credentials, request).await {
        Ok(user) => HttpResponse::Created().json(AuthResponse { user }),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /login - email: {}", request.email);

    match auth_service::login(state.store(), &state.credentials, &request).await {
        Ok((user, token)) => {
            log::info!("✅ Login successful: {}", user.email);
            let cookie = session_cookie(token, state.config.cookie_secure, state.config.token_ttl_hours);
            HttpResponse::Ok().cookie(cookie).json(AuthResponse { user })
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session cookie cleared")
    )
)]
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    log::info!("👋 POST /logout");

    let mut cookie = session_cookie(String::new(), state.config.cookie_secure, 0);
    cookie.make_removal();

    HttpResponse::Ok().cookie(cookie).json(serde_json::json!({ "success": true }))
}
