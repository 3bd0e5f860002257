use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tracing::warn;

use crate::oauth::providers::ProviderConfig;
use crate::oauth::OauthFlowError;

const APP_USER_AGENT: &str = "landing-auth";

/// Exchange the authorization code for an access token. Form-encoded body
/// as required by Google and accepted by GitHub.
pub async fn exchange_code(
    http: &reqwest::Client,
    provider: &ProviderConfig,
    code: &str,
) -> Result<String, OauthFlowError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", provider.client_id.as_str()),
        ("client_secret", provider.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", provider.callback_url.as_str()),
    ];

    let response = http
        .post(&provider.token_url)
        .header(ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "token exchange request failed");
            OauthFlowError::TokenExchange
        })?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "token exchange rejected");
        return Err(OauthFlowError::TokenExchange);
    }

    let tokens: Value = response.json().await.map_err(|e| {
        warn!(error = %e, "token response parse failed");
        OauthFlowError::TokenExchange
    })?;

    // GitHub reports some failures as 200 with an error field.
    if let Some(error) = tokens.get("error").and_then(Value::as_str) {
        warn!(error, "token exchange returned error");
        return Err(OauthFlowError::TokenExchange);
    }

    tokens
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(OauthFlowError::TokenExchange)
}

/// Fetch the raw profile payload. For GitHub, `/user` may omit the email;
/// the primary verified address from the emails endpoint fills it in.
pub async fn fetch_profile(
    http: &reqwest::Client,
    provider: &ProviderConfig,
    access_token: &str,
) -> Result<Value, OauthFlowError> {
    let response = http
        .get(&provider.user_info_url)
        .header(AUTHORIZATION, format!("Bearer {access_token}"))
        .header(USER_AGENT, APP_USER_AGENT)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "user info request failed");
            OauthFlowError::UserInfo
        })?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "user info rejected");
        return Err(OauthFlowError::UserInfo);
    }

    let mut raw: Value = response.json().await.map_err(|e| {
        warn!(error = %e, "user info parse failed");
        OauthFlowError::UserInfo
    })?;

    if raw.get("email").and_then(Value::as_str).is_none() {
        if let Some(emails_url) = &provider.user_emails_url {
            if let Some(email) = fetch_primary_email(http, emails_url, access_token).await {
                raw["email"] = Value::String(email);
            }
        }
    }

    Ok(raw)
}

async fn fetch_primary_email(
    http: &reqwest::Client,
    emails_url: &str,
    access_token: &str,
) -> Option<String> {
    let response = http
        .get(emails_url)
        .header(AUTHORIZATION, format!("Bearer {access_token}"))
        .header(USER_AGENT, APP_USER_AGENT)
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    let emails: Vec<Value> = response.json().await.ok()?;
    emails
        .iter()
        .find(|entry| {
            entry.get("primary").and_then(Value::as_bool).unwrap_or(false)
                && entry.get("verified").and_then(Value::as_bool).unwrap_or(false)
        })
        .and_then(|entry| entry.get("email").and_then(Value::as_str))
        .map(str::to_string)
}
