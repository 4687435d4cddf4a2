use std::env;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
const DEFAULT_BCRYPT_COST: u32 = 12;

/// Cost bounds accepted by bcrypt
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDB { url: String },
    Memory,
}

/// Runtime configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup (the environment in production).
    /// Fails when MongoDB is requested explicitly but no DATABASE_URL is given.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let storage = match lookup("STORAGE_BACKEND").as_deref().map(str::trim) {
            Some("memory") => StorageBackend::Memory,
            Some("mongodb") => match database_url {
                Some(url) => StorageBackend::MongoDB { url },
                None => return Err("STORAGE_BACKEND=mongodb requires DATABASE_URL".to_string()),
            },
            None => match database_url {
                Some(url) => StorageBackend::MongoDB { url },
                None => {
                    log::warn!("⚠️  DATABASE_URL not set, falling back to in-memory storage");
                    StorageBackend::Memory
                }
            },
            Some(other) => {
                log::warn!("⚠️  Unknown STORAGE_BACKEND '{}', using in-memory storage", other);
                StorageBackend::Memory
            }
        };

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("⚠️  JWT_SECRET not set, using the development secret");
            "default-secret-change-me".to_string()
        });

        let bcrypt_cost = lookup("BCRYPT_COST")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BCRYPT_COST)
            .clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST);

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT").and_then(|s| s.parse().ok()).unwrap_or(3000),
            storage,
            jwt_secret,
            token_ttl_hours: lookup("TOKEN_TTL_HOURS")
                .and_then(|s| s.parse().ok())
                .filter(|h: &i64| *h > 0)
                .unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
            bcrypt_cost,
            cookie_secure: matches!(lookup("COOKIE_SECURE").as_deref(), Some("true") | Some("1")),
            allowed_origins,
        })
    }
}
