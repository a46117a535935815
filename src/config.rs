use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Lifetimes for the opaque single-use tokens stored in `auth_tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub refresh_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
    pub verify_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Base URL used when building verification/reset links in emails.
    pub public_base_url: String,
    pub jwt: JwtConfig,
    pub tokens: TokenConfig,
    pub s3: S3Config,
    /// SES sender address; mail is logged instead of sent when unset.
    pub ses_from_email: Option<String>,
    pub ai: AiConfig,
    /// When true, raw verification/reset tokens are echoed in API responses.
    /// Local testing only; must stay off in production.
    pub return_debug_tokens: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "homefix".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "homefix-users".into()),
            ttl_minutes: env_minutes("JWT_TTL_MINUTES", 15),
        };

        let tokens = TokenConfig {
            refresh_ttl_minutes: env_minutes("REFRESH_TOKEN_TTL_MINUTES", 60 * 24 * 14),
            reset_ttl_minutes: env_minutes("RESET_TOKEN_TTL_MINUTES", 30),
            verify_ttl_minutes: env_minutes("VERIFY_TOKEN_TTL_MINUTES", 60 * 24),
        };

        let s3 = S3Config {
            endpoint: std::env::var("S3_ENDPOINT")?,
            bucket: std::env::var("S3_BUCKET")?,
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };

        let ai = AiConfig {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".into()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
        };

        let return_debug_tokens = std::env::var("RETURN_DEBUG_TOKENS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            public_base_url,
            jwt,
            tokens,
            s3,
            ses_from_email: std::env::var("SES_FROM_EMAIL").ok(),
            ai,
            return_debug_tokens,
        })
    }
}

fn env_minutes(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
