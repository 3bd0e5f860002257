use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{Provider, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, avatar, provider, provider_id, \
                            role, plan, email_verified, created_at, updated_at";

impl User {
    /// Find a user by email. Emails are stored lowercase.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a locally-registered user with an already-hashed password.
    pub async fn create_local(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, provider)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(Provider::Local)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Create a user from an OAuth profile. No password hash; the provider
    /// has already verified the email.
    pub async fn create_federated(
        db: &PgPool,
        name: &str,
        email: &str,
        provider: Provider,
        provider_id: &str,
        avatar: Option<&str>,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, provider, provider_id, avatar, email_verified)
             VALUES ($1, $2, $3, $4, $5, TRUE)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(provider)
        .bind(provider_id)
        .bind(avatar)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Re-tag an existing account after federation through a different
    /// provider. Leaves name, role, plan and password_hash untouched.
    pub async fn relink_provider(
        db: &PgPool,
        id: Uuid,
        provider: Provider,
        provider_id: &str,
        avatar: Option<&str>,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET provider = $2, provider_id = $3, avatar = $4,
                 email_verified = TRUE, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(provider)
        .bind(provider_id)
        .bind(avatar)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Partial profile update; absent fields keep their current value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = COALESCE($2, name), email = COALESCE($3, email), updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
