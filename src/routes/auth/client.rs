//! Calls to the hosted auth service and to the VIDIS token endpoint.

use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::{Config, VidisConfig},
    error::AppError,
};

use super::model::provider_error;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PasswordGrantResponse {
    user: AuthUser,
}

#[derive(Debug, Default, Deserialize)]
struct AuthServiceError {
    error_description: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

impl AuthServiceError {
    fn message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.error)
            .unwrap_or_else(|| "Anmeldung fehlgeschlagen".to_string())
    }
}

/// The authorization endpoint URL a browser is sent to for a VIDIS login.
pub fn authorization_url(
    vidis: &VidisConfig,
    state: &str,
    idp_hint: Option<&str>,
) -> Result<Url, AppError> {
    let mut url = Url::parse(&vidis.authorization_endpoint())
        .map_err(|e| AppError::Internal(format!("invalid VIDIS issuer: {}", e)))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &vidis.client_id)
            .append_pair("redirect_uri", &vidis.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &vidis.scope)
            .append_pair("state", state);
        if let Some(hint) = idp_hint {
            query.append_pair("kc_idp_hint", hint);
        }
    }

    Ok(url)
}

/// Exchanges an authorization code for the VIDIS access token. The client
/// secret, when configured, is only ever sent from here.
pub async fn exchange_code(
    http: &reqwest::Client,
    vidis: &VidisConfig,
    code: &str,
) -> Result<String, AppError> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", vidis.client_id.as_str()),
        ("redirect_uri", vidis.redirect_uri.as_str()),
    ];
    if let Some(secret) = vidis.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let resp = http.post(vidis.token_endpoint()).form(&form).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body: ProviderErrorBody = resp.json().await.unwrap_or_default();
        tracing::warn!("VIDIS token exchange returned {}: {:?}", status, body.error);
        return Err(provider_error(
            body.error.as_deref().unwrap_or("token_exchange_failed"),
        ));
    }

    let token: TokenResponse = resp.json().await?;
    Ok(token.access_token)
}

/// Checks email and password against the hosted auth service and returns
/// the account id.
pub async fn password_grant(
    http: &reqwest::Client,
    config: &Config,
    email: &str,
    password: &str,
) -> Result<Uuid, AppError> {
    let resp = http
        .post(format!(
            "{}/auth/v1/token?grant_type=password",
            config.auth_backend_url
        ))
        .header("apikey", &config.auth_backend_api_key)
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await?;

    if !resp.status().is_success() {
        let body: AuthServiceError = resp.json().await.unwrap_or_default();
        return Err(AppError::InvalidCredentials(body.message()));
    }

    let grant: PasswordGrantResponse = resp.json().await?;
    Ok(grant.user.id)
}
