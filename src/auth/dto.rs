use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for profile update. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Response returned after register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

/// Identity summary returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Full user view for `/me`; the password hash is excluded by the `User`
/// serialization itself.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{test_user, Provider};

    #[test]
    fn user_response_omits_password_hash() {
        let response = UserResponse {
            success: true,
            user: test_user(Provider::Local, Some("$argon2id$fake")),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("alice@x.com"));
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn public_user_carries_identity_fields_only() {
        let user = test_user(Provider::Github, None);
        let public = PublicUser::from(&user);
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("\"id\""));
        assert!(json.contains("\"name\""));
        assert!(json.contains("\"email\""));
        assert!(!json.contains("provider"));
    }
}
