use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Database configuration
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication configuration
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub session_cookie_name: String,

    // Bootstrap superuser
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    // Content settings
    pub default_page_size: usize,
    pub max_page_size: usize,

    // Feature flags
    pub enable_registrations: bool,

    // CORS configuration
    pub cors_allowed_origins: String,
}

const DEVELOPMENT_JWT_SECRET: &str = "marcador-development-secret";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // 生产环境必须显式配置密钥
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment == "development" || environment == "test" => {
                DEVELOPMENT_JWT_SECRET.to_string()
            }
            _ => anyhow::bail!("JWT_SECRET must be set outside development"),
        };

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,
            environment,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://marcador.db?mode=rwc".to_string()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            jwt_secret,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "marcador_session".to_string()),

            admin_username: env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),

            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            max_page_size: env::var("MAX_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            enable_registrations: env::var("ENABLE_REGISTRATIONS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            session_cookie_name: "marcador_session".to_string(),
            admin_username: None,
            admin_password: None,
            default_page_size: 20,
            max_page_size: 100,
            enable_registrations: false,
            cors_allowed_origins: "http://localhost:8000".to_string(),
        }
    }
}
