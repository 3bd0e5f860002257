use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

/// Client settings for one OAuth provider. Present only when both the
/// client id and secret are configured.
#[derive(Debug, Clone, Deserialize)]
pub struct OauthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub google: Option<OauthClientConfig>,
    pub github: Option<OauthClientConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "landing-auth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "landing-auth-users".into()),
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let cookie_secure = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let google = oauth_client_from_env(
            "GOOGLE",
            "http://localhost:8080/api/auth/oauth/google/callback",
        );
        let github = oauth_client_from_env(
            "GITHUB",
            "http://localhost:8080/api/auth/oauth/github/callback",
        );
        Ok(Self {
            database_url,
            jwt,
            cookie_secure,
            google,
            github,
        })
    }
}

fn oauth_client_from_env(prefix: &str, default_callback: &str) -> Option<OauthClientConfig> {
    let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    let callback_url = std::env::var(format!("{prefix}_CALLBACK_URL"))
        .unwrap_or_else(|_| default_callback.into());
    Some(OauthClientConfig {
        client_id,
        client_secret,
        callback_url,
    })
}
