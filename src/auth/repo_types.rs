use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Channel that last established or updated the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
    Github,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Google => "google",
            Provider::Github => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Provider::Local),
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::Github),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_plan", rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // NULL for OAuth-only users, never exposed in JSON
    pub avatar: Option<String>,
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub role: Role,
    pub plan: Plan,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
pub(crate) fn test_user(provider: Provider, password_hash: Option<&str>) -> User {
    let now = OffsetDateTime::now_utc();
    User {
        id: Uuid::new_v4(),
        name: "Alice".into(),
        email: "alice@x.com".into(),
        password_hash: password_hash.map(str::to_string),
        avatar: None,
        provider,
        provider_id: match provider {
            Provider::Local => None,
            _ => Some("ext-123".into()),
        },
        role: Role::User,
        plan: Plan::Free,
        email_verified: provider != Provider::Local,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = test_user(Provider::Local, Some("$argon2id$fake"));
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("alice@x.com"));
    }

    #[test]
    fn provider_parses_known_names_only() {
        assert_eq!("google".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!("github".parse::<Provider>(), Ok(Provider::Github));
        assert_eq!("local".parse::<Provider>(), Ok(Provider::Local));
        assert!("gitlab".parse::<Provider>().is_err());
        assert!("Google".parse::<Provider>().is_err());
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::Github).unwrap(), "\"github\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Plan::Free).unwrap(), "\"free\"");
    }
}
