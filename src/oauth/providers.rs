use std::collections::HashMap;

use tracing::{debug, info};

use crate::auth::repo_types::Provider;
use crate::config::{AppConfig, OauthClientConfig};

/// Endpoints and credentials for one configured OAuth provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub authorize_url: String,
    pub token_url: String,
    pub user_info_url: String,
    pub user_emails_url: Option<String>,
    pub scopes: Vec<String>,
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

impl ProviderConfig {
    fn google(client: &OauthClientConfig) -> Self {
        Self {
            provider: Provider::Google,
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            user_info_url: "https://www.googleapis.com/oauth2/v2/userinfo".into(),
            user_emails_url: None,
            scopes: vec!["profile".into(), "email".into()],
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            callback_url: client.callback_url.clone(),
        }
    }

    fn github(client: &OauthClientConfig) -> Self {
        Self {
            provider: Provider::Github,
            authorize_url: "https://github.com/login/oauth/authorize".into(),
            token_url: "https://github.com/login/oauth/access_token".into(),
            user_info_url: "https://api.github.com/user".into(),
            user_emails_url: Some("https://api.github.com/user/emails".into()),
            scopes: vec!["user:email".into()],
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            callback_url: client.callback_url.clone(),
        }
    }

    /// Authorization-code request URL the user's browser is sent to.
    pub fn authorize_redirect(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(state),
            urlencoding::encode(&self.scopes.join(" ")),
        )
    }
}

/// Capability table mapping provider names to their endpoints. Populated at
/// startup; a provider without configured credentials is simply absent.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, ProviderConfig>,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut providers = HashMap::new();

        match &config.google {
            Some(client) => {
                providers.insert(Provider::Google, ProviderConfig::google(client));
                info!(provider = "google", "oauth provider configured");
            }
            None => debug!(provider = "google", "oauth provider not configured"),
        }
        match &config.github {
            Some(client) => {
                providers.insert(Provider::Github, ProviderConfig::github(client));
                info!(provider = "github", "oauth provider configured");
            }
            None => debug!(provider = "github", "oauth provider not configured"),
        }

        Self { providers }
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.providers.get(&provider)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
