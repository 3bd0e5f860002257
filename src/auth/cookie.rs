use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::AppConfig;

pub const TOKEN_COOKIE: &str = "token";

/// Session cookie carrying the signed token. HttpOnly always, Secure in
/// production, lifetime matching the token TTL.
pub fn auth_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(TOKEN_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::days(config.jwt.ttl_days));
    cookie
}

/// Overwrites the session cookie with a value that expires almost
/// immediately. Logout is purely client-side; the token itself stays
/// cryptographically valid until its natural expiry.
pub fn logout_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(TOKEN_COOKIE, "none");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_max_age(Duration::seconds(10));
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn auth_cookie_is_http_only_with_token_ttl() {
        let state = AppState::fake();
        let cookie = auth_cookie("tok123".into(), &state.config);
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "tok123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn logout_cookie_discards_the_token() {
        let cookie = logout_cookie();
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "none");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(10)));
    }
}
