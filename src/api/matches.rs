use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::services::match_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/matches",
    tag = "Matches",
    params(
        ("userId" = String, Query, description = "User to find mentors or mentees for")
    ),
    responses(
        (status = 200, description = "Candidates of the opposite role, best first", body = Vec<match_service::MatchResult>),
        (status = 400, description = "userId missing"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_matches(state: web::Data<AppState>, query: web::Query<MatchesQuery>) -> HttpResponse {
    let user_id = match query.user_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            log::warn!("❌ GET /matches without userId");
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "userId is required"
            }));
        }
    };

    log::info!("🎯 GET /matches - userId: {}", user_id);

    match match_service::find_matches(state.store(), &user_id).await {
        Ok(matches) => {
            log::info!("✅ {} matches for {}", matches.len(), user_id);
            HttpResponse::Ok().json(serde_json::json!({ "matches": matches }))
        }
        Err(e) => {
            log::warn!("❌ Matching failed for {}: {}", user_id, e);
            e.error_response()
        }
    }
}
