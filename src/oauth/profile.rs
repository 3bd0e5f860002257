use serde_json::Value;

use crate::auth::repo_types::Provider;
use crate::oauth::OauthFlowError;

/// Provider-agnostic view of an external profile payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProfile {
    pub provider_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl NormalizedProfile {
    /// The account-merge key. When the provider omits the email, a
    /// deterministic placeholder `{username}@{provider}.local` stands in.
    pub fn email_or_placeholder(&self, provider: Provider) -> String {
        match &self.email {
            Some(email) => email.trim().to_lowercase(),
            None => format!(
                "{}@{}.local",
                self.username.as_deref().unwrap_or(&self.provider_id),
                provider
            )
            .to_lowercase(),
        }
    }

    /// Display name, clamped to the column width.
    pub fn display_name(&self) -> String {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(self.username.as_deref())
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "User".into());
        name.chars().take(50).collect()
    }
}

pub fn normalize(provider: Provider, raw: &Value) -> Result<NormalizedProfile, OauthFlowError> {
    match provider {
        Provider::Google => from_google(raw),
        Provider::Github => from_github(raw),
        Provider::Local => Err(OauthFlowError::UnknownProvider("local".into())),
    }
}

fn opt_str(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Google userinfo payload: `id`, `email`, `name`, `picture`.
fn from_google(raw: &Value) -> Result<NormalizedProfile, OauthFlowError> {
    let provider_id = opt_str(raw, "id")
        .or_else(|| opt_str(raw, "sub"))
        .ok_or(OauthFlowError::MalformedProfile)?;
    Ok(NormalizedProfile {
        provider_id,
        email: opt_str(raw, "email"),
        name: opt_str(raw, "name"),
        username: None,
        avatar: opt_str(raw, "picture"),
    })
}

/// GitHub `/user` payload: numeric `id`, `login`, `name` (nullable),
/// `email` (often null), `avatar_url`.
fn from_github(raw: &Value) -> Result<NormalizedProfile, OauthFlowError> {
    let provider_id = match raw.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err(OauthFlowError::MalformedProfile),
    };
    Ok(NormalizedProfile {
        provider_id,
        email: opt_str(raw, "email"),
        name: opt_str(raw, "name"),
        username: opt_str(raw, "login"),
        avatar: opt_str(raw, "avatar_url"),
    })
}
