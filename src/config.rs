use std::env;
use std::fmt;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const DATABASE: &str = "TourBooking";
const JWT_TTL_HOURS: i64 = 24;
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const FROM_EMAIL: &str = "noreply@tourguide.app";
const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings read from the process environment (and `.env` in debug builds).
///
/// Integrations with no credentials configured (`GEMINI_API_KEY`, `TOUR_IMAGE_BUCKET`,
/// `SENDGRID_API_KEY`) stay `None`; the matching feature then answers with a fallback
/// instead of aborting startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo_uri: String,
    pub database: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub tour_image_bucket: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_url: String,
    pub from_email: String,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mongo_uri = env::var("MONGODB_URI").map_err(|_| ConfigError::Missing("MONGODB_URI"))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| HOST.to_string()),
            port: parse_or("PORT", PORT),
            mongo_uri,
            database: env::var("MONGODB_DATABASE").unwrap_or_else(|_| DATABASE.to_string()),
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", JWT_TTL_HOURS),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| GEMINI_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| GEMINI_BASE_URL.to_string()),
            tour_image_bucket: optional("TOUR_IMAGE_BUCKET"),
            sendgrid_api_key: optional("SENDGRID_API_KEY"),
            sendgrid_url: env::var("SENDGRID_URL").unwrap_or_else(|_| SENDGRID_URL.to_string()),
            from_email: env::var("FROM_EMAIL").unwrap_or_else(|_| FROM_EMAIL.to_string()),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS),
        })
    }

    /// Settings for tests and local tooling; nothing external is configured.
    pub fn for_tests() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            database: format!("{}Test", DATABASE),
            jwt_secret: "test_secret".to_string(),
            jwt_ttl_hours: JWT_TTL_HOURS,
            gemini_api_key: None,
            gemini_model: GEMINI_MODEL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            tour_image_bucket: None,
            sendgrid_api_key: None,
            sendgrid_url: SENDGRID_URL.to_string(),
            from_email: FROM_EMAIL.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
