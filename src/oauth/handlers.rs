use axum::{
    extract::{FromRef, Path, Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use time::Duration;
use tracing::{info, instrument, warn};

use crate::auth::cookie::auth_cookie;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{Provider, User};
use crate::config::AppConfig;
use crate::oauth::{client, profile, resolve, OauthFlowError};
use crate::state::AppState;

const STATE_COOKIE: &str = "oauth_state";
const STATE_TTL_MINUTES: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/oauth/:provider", get(oauth_start))
        .route("/oauth/:provider/callback", get(oauth_callback))
}

fn csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn state_cookie(value: String, config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(STATE_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::minutes(STATE_TTL_MINUTES));
    cookie
}

fn remove_state_cookie(jar: CookieJar) -> CookieJar {
    let mut removal = Cookie::from(STATE_COOKIE);
    removal.set_path("/");
    jar.remove(removal)
}

fn login_error(jar: CookieJar, message: &str) -> (CookieJar, Redirect) {
    let location = format!("/login?error={}", urlencoding::encode(message));
    (jar, Redirect::to(&location))
}

/// Entry point of the authorization-code flow: remembers a CSRF state in a
/// short-lived cookie and sends the browser to the provider.
#[instrument(skip(state, jar))]
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let config = provider
        .parse::<Provider>()
        .ok()
        .and_then(|p| state.oauth.get(p));
    let Some(config) = config else {
        warn!(provider = %provider, "unknown or unconfigured oauth provider");
        return login_error(jar, &format!("Unknown OAuth provider '{provider}'"));
    };

    let csrf = csrf_token();
    let authorize_url = config.authorize_redirect(&csrf);
    info!(provider = %provider, "redirecting to oauth provider");
    (
        jar.add(state_cookie(csrf, &state.config)),
        Redirect::to(&authorize_url),
    )
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Provider redirect target. On success the browser lands on the dashboard
/// with the token set as a cookie and echoed in the URL for client-side
/// storage; on any failure it lands on the login page with an error message.
#[instrument(skip(app, params, jar))]
pub async fn oauth_callback(
    State(app): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = remove_state_cookie(jar);

    match run_callback(&app, &provider, params, expected_state).await {
        Ok((user, token)) => {
            info!(user_id = %user.id, provider = %provider, "oauth login succeeded");
            let location = format!("/dashboard?auth=success&token={token}");
            (
                jar.add(auth_cookie(token, &app.config)),
                Redirect::to(&location),
            )
        }
        Err(err) => {
            warn!(provider = %provider, error = %err, "oauth callback failed");
            login_error(jar, &err.to_string())
        }
    }
}

async fn run_callback(
    app: &AppState,
    provider_name: &str,
    params: CallbackParams,
    expected_state: Option<String>,
) -> Result<(User, String), OauthFlowError> {
    let provider: Provider = provider_name
        .parse()
        .map_err(|_| OauthFlowError::UnknownProvider(provider_name.to_string()))?;
    let config = app
        .oauth
        .get(provider)
        .ok_or_else(|| OauthFlowError::UnknownProvider(provider_name.to_string()))?;

    // The provider may come back with an error instead of a code.
    if let Some(error) = params.error {
        let message = params.error_description.unwrap_or(error);
        return Err(OauthFlowError::ProviderDenied(message));
    }

    let code = params.code.ok_or(OauthFlowError::MissingCode)?;
    let returned_state = params.state.ok_or(OauthFlowError::InvalidState)?;
    match expected_state {
        Some(expected) if expected == returned_state => {}
        _ => return Err(OauthFlowError::InvalidState),
    }

    let access_token = client::exchange_code(&app.http, config, &code).await?;
    let raw = client::fetch_profile(&app.http, config, &access_token).await?;
    let normalized = profile::normalize(provider, &raw)?;

    let user = resolve::resolve(&app.db, provider, &normalized).await?;
    let token = JwtKeys::from_ref(app)
        .sign(user.id)
        .map_err(|_| OauthFlowError::Internal)?;

    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_params() -> CallbackParams {
        CallbackParams {
            code: None,
            state: None,
            error: None,
            error_description: None,
        }
    }

    #[test]
    fn csrf_tokens_are_long_and_unique() {
        let a = csrf_token();
        let b = csrf_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn state_cookie_is_short_lived_and_http_only() {
        let state = AppState::fake();
        let cookie = state_cookie("abc".into(), &state.config);
        assert_eq!(cookie.name(), STATE_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(Duration::minutes(10)));
    }

    #[tokio::test]
    async fn callback_rejects_unknown_provider() {
        let app = AppState::fake();
        let err = run_callback(&app, "gitlab", empty_params(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OauthFlowError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn callback_surfaces_provider_denial() {
        let app = AppState::fake();
        let params = CallbackParams {
            error: Some("access_denied".into()),
            error_description: Some("The user denied the request".into()),
            ..empty_params()
        };
        let err = run_callback(&app, "github", params, None).await.unwrap_err();
        match err {
            OauthFlowError::ProviderDenied(msg) => {
                assert_eq!(msg, "The user denied the request")
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn callback_requires_an_authorization_code() {
        let app = AppState::fake();
        let err = run_callback(&app, "github", empty_params(), Some("s".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, OauthFlowError::MissingCode));
    }

    #[tokio::test]
    async fn callback_rejects_state_mismatch() {
        let app = AppState::fake();
        let params = CallbackParams {
            code: Some("code123".into()),
            state: Some("returned".into()),
            ..empty_params()
        };
        let err = run_callback(&app, "github", params, Some("expected".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, OauthFlowError::InvalidState));
    }

    #[tokio::test]
    async fn callback_rejects_missing_state_cookie() {
        let app = AppState::fake();
        let params = CallbackParams {
            code: Some("code123".into()),
            state: Some("returned".into()),
            ..empty_params()
        };
        let err = run_callback(&app, "github", params, None).await.unwrap_err();
        assert!(matches!(err, OauthFlowError::InvalidState));
    }
}
