use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::state::AppState;
use crate::utils::AppError;

/// Session cookie set by POST /login
pub const SESSION_COOKIE: &str = "token";

/// Identity of a caller whose session token checked out.
///
/// Taking this as a handler argument rejects unauthenticated requests with
/// 401 before the handler body runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    user_id: String,
}

impl AuthenticatedUser {
    pub(crate) fn new(user_id: String) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Token from the `token` cookie, falling back to `Authorization: Bearer`
pub fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state not configured".to_string()))?;

    let token = session_token(req).ok_or(AppError::Unauthorized)?;

    match state.credentials.verify_token(&token).into_user() {
        Some(user) => Ok(user),
        None => {
            log::warn!("❌ Invalid session token on {}", req.path());
            Err(AppError::Unauthorized)
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
