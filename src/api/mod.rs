pub mod auth;
pub mod connections;
pub mod health;
pub mod matches;
pub mod notifications;
pub mod socket;
pub mod swagger;
pub mod users;

use actix_web::{error::InternalError, web, HttpResponse};

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": message
    }))
}

// Malformed bodies and query strings get the same JSON error shape as everything else
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::warn!("❌ Invalid JSON body on {}: {}", req.path(), err);
        let response = bad_request(err.to_string());
        InternalError::from_response(err, response).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        log::warn!("❌ Invalid query string on {}: {}", req.path(), err);
        let response = bad_request(err.to_string());
        InternalError::from_response(err, response).into()
    })
}

/// Every route the service exposes, shared by `main` and the handler tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Auth endpoints
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/logout", web::post().to(auth::logout))
        // ==================== USERS & MATCHING ====================
        .route("/users", web::get().to(users::list_users))
        .route("/profile/{user_id}", web::get().to(users::get_profile))
        .route("/profile/{user_id}", web::put().to(users::update_profile))
        .route("/matches", web::get().to(matches::get_matches))
        // ==================== CONNECTIONS ====================
        .service(
            web::scope("/connections")
                .route("", web::get().to(connections::list_connections))
                .route("/accepted", web::get().to(connections::list_accepted))
                .route("/request", web::post().to(connections::request_connection))
                .route("/{connection_id}", web::patch().to(connections::update_connection))
                .route("/{connection_id}", web::delete().to(connections::delete_connection)),
        )
        // ==================== NOTIFICATIONS ====================
        .service(
            web::scope("/notifications")
                .route("", web::get().to(notifications::list_notifications))
                .route("", web::post().to(notifications::create_notification))
                .route("/{notification_id}", web::patch().to(notifications::update_notification)),
        )
        // ==================== REAL-TIME ====================
        .route("/socket", web::get().to(socket::socket));
}
