use crate::state::AppState;
use axum::Router;
use thiserror::Error;

pub mod client;
pub mod handlers;
pub mod profile;
pub mod providers;
pub mod resolve;

/// Failures in the OAuth roundtrip. Every variant ends as a
/// `/login?error=...` redirect rather than a JSON error.
#[derive(Debug, Error)]
pub enum OauthFlowError {
    #[error("Unknown OAuth provider '{0}'")]
    UnknownProvider(String),

    /// The provider reported an error (user denied consent, bad client
    /// config). Carries the provider's description verbatim.
    #[error("{0}")]
    ProviderDenied(String),

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("Token exchange failed")]
    TokenExchange,

    #[error("Failed to fetch user info")]
    UserInfo,

    #[error("Provider profile was malformed")]
    MalformedProfile,

    #[error("Login failed")]
    Internal,
}

impl From<sqlx::Error> for OauthFlowError {
    fn from(_: sqlx::Error) -> Self {
        OauthFlowError::Internal
    }
}

pub fn router() -> Router<AppState> {
    handlers::routes()
}
