use std::env;
use std::str::FromStr;

/// Settings for the outbound SMTP transport.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from_name: String,
    pub from_email: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

/// Service configuration, read once at startup from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL embedded into password reset links.
    pub public_base_url: String,
    /// Secret used to sign session tokens.
    pub jwt_secret: String,
    /// Lifetime of an issued session token and its cookie.
    pub session_ttl_days: i64,
    /// Lifetime of a password reset token.
    pub reset_token_ttl_minutes: i64,
    pub smtp: SmtpSettings,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => panic!("$JWT_SECRET is not set."),
        };
        ServiceConfig {
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:8000"),
            jwt_secret,
            session_ttl_days: env_parse_or("SESSION_TTL_DAYS", 5),
            reset_token_ttl_minutes: env_parse_or("RESET_TOKEN_TTL_MINUTES", 15),
            smtp: SmtpSettings {
                host: env_or("SMTP_HOST", "localhost"),
                port: env_parse_or("SMTP_PORT", 1025),
                from_name: env_or("SMTP_FROM_NAME", "Shop"),
                from_email: env_or("SMTP_FROM_EMAIL", "noreply@localhost"),
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                use_tls: env_or("SMTP_USE_TLS", "false") == "true",
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
