use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Outbound mail settings. Without `from` the service logs messages instead of sending them.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "campus".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "campus-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
        };
        let mail = MailConfig {
            from: std::env::var("MAIL_FROM").ok().filter(|v| !v.is_empty()),
            region: std::env::var("SES_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("SES_ENDPOINT").ok(),
            access_key: std::env::var("SES_ACCESS_KEY").ok(),
            secret_key: std::env::var("SES_SECRET_KEY").ok(),
        };
        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            database_url,
            jwt,
            mail,
            frontend_url,
        })
    }
}
