use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use tracing::warn;

use crate::auth::cookie::TOKEN_COOKIE;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

/// Pulls the session token from the request: `Authorization: Bearer` header
/// first, `token` cookie as fallback.
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| {
            auth.strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
        })
        .map(str::to_string);
    if bearer.is_some() {
        return bearer;
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<User, ApiError> {
    let token = token_from_headers(&parts.headers).ok_or(ApiError::Unauthenticated)?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(&token).map_err(|_| {
        warn!("invalid or expired token");
        ApiError::Unauthenticated
    })?;

    // Token may outlive its user (deleted account, rotated id).
    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            ApiError::Unauthenticated
        })?;

    Ok(user)
}

/// Session gate: resolves the acting identity or rejects with 401. Missing,
/// malformed and expired tokens are indistinguishable to the caller.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state).await.map(CurrentUser)
    }
}

/// Non-rejecting variant for surfaces that render either way: `None` on any
/// resolution failure.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(resolve_user(parts, state).await.ok()))
    }
}

/// Role check companion to the session gate.
pub fn authorize(user: &User, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = ?user.role, "role not authorized");
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{test_user, Provider};
    use axum::http::Request;
    use uuid::Uuid;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_header_takes_priority_over_cookie() {
        let parts = parts_with(&[
            ("authorization", "Bearer header-token"),
            ("cookie", "token=cookie-token"),
        ]);
        assert_eq!(
            token_from_headers(&parts.headers).as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn cookie_is_used_when_no_bearer_header() {
        let parts = parts_with(&[("cookie", "other=1; token=cookie-token")]);
        assert_eq!(
            token_from_headers(&parts.headers).as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn non_bearer_scheme_falls_through_to_cookie() {
        let parts = parts_with(&[
            ("authorization", "Basic dXNlcjpwYXNz"),
            ("cookie", "token=cookie-token"),
        ]);
        assert_eq!(
            token_from_headers(&parts.headers).as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn no_token_sources_yields_none() {
        let parts = parts_with(&[]);
        assert_eq!(token_from_headers(&parts.headers), None);
    }

    #[tokio::test]
    async fn gate_rejects_missing_token_as_unauthenticated() {
        let state = AppState::fake();
        let mut parts = parts_with(&[]);
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn gate_rejects_malformed_token_as_unauthenticated() {
        let state = AppState::fake();
        let mut parts = parts_with(&[("authorization", "Bearer not-a-jwt")]);
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn gate_rejects_expired_token_as_unauthenticated() {
        use crate::auth::claims::Claims;
        use jsonwebtoken::{encode, Header};
        use time::OffsetDateTime;

        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();

        let header = format!("Bearer {token}");
        let mut parts = parts_with(&[("authorization", header.as_str())]);
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn optional_user_never_rejects() {
        let state = AppState::fake();
        let mut parts = parts_with(&[("authorization", "Bearer garbage")]);
        let OptionalUser(user) = OptionalUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[test]
    fn authorize_checks_role_membership() {
        let user = test_user(Provider::Local, Some("hash"));
        assert!(authorize(&user, &[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            authorize(&user, &[Role::Admin]),
            Err(ApiError::Forbidden)
        ));
    }
}
