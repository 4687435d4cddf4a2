use std::sync::Arc;

use crate::{config::AppConfig, database::Store, services::auth_service::Credentials, services::FanoutHub};

/// Shared by every worker through `web::Data<AppState>`
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub credentials: Credentials,
    pub hub: FanoutHub,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            store,
            credentials: Credentials::from_config(&config),
            hub: FanoutHub::new(),
            config,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
