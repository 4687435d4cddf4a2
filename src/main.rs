mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{MemoryStore, MongoDB, Store};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting Mentor Match...");

    let store: Arc<dyn Store> = match &config.storage {
        StorageBackend::MongoDB { url } => {
            let db = MongoDB::new(url).await.map_err(|e| {
                log::error!("❌ Failed to connect to MongoDB: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;
            log::info!("✅ MongoDB connected successfully");
            Arc::new(db)
        }
        StorageBackend::Memory => {
            log::warn!("🧪 Using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = (config.host.clone(), config.port);
    let allowed_origins = config.allowed_origins.clone();

    let state = web::Data::new(AppState::new(store, config));
    state.hub.start();

    log::info!("🌐 Server starting on {}:{}", bind_addr.0, bind_addr.1);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", bind_addr.0, bind_addr.1);

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", api::swagger::ApiDoc::openapi()),
            )
            .configure(api::routes)
    })
    .bind(bind_addr)?
    .run();

    let result = server.await;

    state.hub.stop();
    log::info!("👋 Mentor Match stopped");

    result
}
