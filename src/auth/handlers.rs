use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::auth::{
    cookie::{auth_cookie, logout_cookie},
    dto::{
        AuthResponse, LoginRequest, ProfileResponse, PublicUser, RegisterRequest,
        UpdateProfileRequest, UserResponse,
    },
    extractors::CurrentUser,
    jwt::JwtKeys,
    password::{hash_password, verify_optional},
    repo_types::User,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout).get(logout_redirect))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/update", put(update_profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (1..=50).contains(&len)
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if !is_valid_name(&payload.name) {
        warn!("invalid name length");
        return Err(ApiError::Validation(
            "Name must be between 1 and 50 characters".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    // Best-effort pre-check; the unique index catches racing registrations.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create_local(&state.db, &payload.name, &payload.email, &hash).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    let jar = jar.add(auth_cookie(token.clone(), &state.config));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            success: true,
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    // Unknown email, OAuth-only account and wrong password all collapse to
    // the same response; the logs keep the distinction.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(user) => user,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if user.password_hash.is_none() {
        warn!(user_id = %user.id, provider = %user.provider, "password login on oauth-only account");
        return Err(ApiError::InvalidCredentials);
    }

    if !verify_optional(&payload.password, user.password_hash.as_deref()) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");

    let jar = jar.add(auth_cookie(token.clone(), &state.config));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.add(logout_cookie()),
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    )
}

/// GET variant for direct links; clears the cookie and sends the browser home.
pub async fn logout_redirect(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.add(logout_cookie()), Redirect::to("/"))
}

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        user,
    })
}

#[instrument(skip(state, current, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let CurrentUser(user) = current;

    let name = match payload.name.as_deref().map(str::trim) {
        Some(name) => {
            if !is_valid_name(name) {
                return Err(ApiError::Validation(
                    "Name must be between 1 and 50 characters".into(),
                ));
            }
            Some(name.to_string())
        }
        None => None,
    };

    let email = match payload.email.as_deref() {
        Some(email) => {
            let email = email.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(ApiError::Validation("Invalid email".into()));
            }
            Some(email)
        }
        None => None,
    };

    let updated = User::update_profile(&state.db, user.id, name.as_deref(), email.as_deref())
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(ProfileResponse {
        success: true,
        user: PublicUser::from(&updated),
    }))
}
