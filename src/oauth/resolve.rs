use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{Provider, User};
use crate::oauth::profile::NormalizedProfile;

/// Outcome of matching an external profile against the credential store.
#[derive(Debug, Clone, PartialEq)]
pub enum FederationPlan {
    /// Same email, same provider: repeated login, nothing to write.
    UseExisting { id: Uuid },
    /// Same email, different channel: re-tag the account. The password hash
    /// is left untouched.
    Relink {
        id: Uuid,
        provider_id: String,
        avatar: Option<String>,
    },
    /// First time this email is seen.
    Create {
        name: String,
        email: String,
        provider_id: String,
        avatar: Option<String>,
    },
}

/// Email is the sole account-merge key across providers and local
/// registration.
pub fn plan_federation(
    existing: Option<&User>,
    provider: Provider,
    profile: &NormalizedProfile,
) -> FederationPlan {
    match existing {
        Some(user) if user.provider == provider => FederationPlan::UseExisting { id: user.id },
        Some(user) => FederationPlan::Relink {
            id: user.id,
            provider_id: profile.provider_id.clone(),
            avatar: profile.avatar.clone().or_else(|| user.avatar.clone()),
        },
        None => FederationPlan::Create {
            name: profile.display_name(),
            email: profile.email_or_placeholder(provider),
            provider_id: profile.provider_id.clone(),
            avatar: profile.avatar.clone(),
        },
    }
}

pub async fn resolve(
    db: &PgPool,
    provider: Provider,
    profile: &NormalizedProfile,
) -> sqlx::Result<User> {
    let email = profile.email_or_placeholder(provider);
    let existing = User::find_by_email(db, &email).await?;

    match (plan_federation(existing.as_ref(), provider, profile), existing) {
        (FederationPlan::UseExisting { .. }, Some(user)) => Ok(user),
        (
            FederationPlan::Relink {
                id,
                provider_id,
                avatar,
            },
            _,
        ) => User::relink_provider(db, id, provider, &provider_id, avatar.as_deref()).await,
        (
            FederationPlan::Create {
                name,
                email,
                provider_id,
                avatar,
            },
            _,
        ) => {
            User::create_federated(db, &name, &email, provider, &provider_id, avatar.as_deref())
                .await
        }
        (FederationPlan::UseExisting { .. }, None) => Err(sqlx::Error::RowNotFound),
    }
}
