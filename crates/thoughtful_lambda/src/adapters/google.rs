//! Google ID token verification through the tokeninfo endpoint.

use serde_json::Value;
use thiserror::Error;

pub const GOOGLE_TOKEN_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GoogleAuthError {
    #[error("token audience does not match the configured client id")]
    AudienceMismatch,
    #[error("token info carries no email")]
    MissingEmail,
    #[error("token verification request failed: {0}")]
    Request(String),
}

pub trait GoogleTokenVerifier {
    fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError>;
}

/// Checks the audience and pulls the email out of a tokeninfo response.
/// An unverified email is accepted and only logged.
pub fn identity_from_token_info(
    token_info: &Value,
    client_id: &str,
) -> Result<GoogleIdentity, GoogleAuthError> {
    if token_info.get("aud").and_then(Value::as_str) != Some(client_id) {
        tracing::error!(component = "google_auth", event = "audience_mismatch");
        return Err(GoogleAuthError::AudienceMismatch);
    }
    let email = token_info
        .get("email")
        .and_then(Value::as_str)
        .filter(|email| !email.is_empty())
        .ok_or(GoogleAuthError::MissingEmail)?;
    let email_verified = match token_info.get("email_verified") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag == "true",
        _ => false,
    };
    if !email_verified {
        tracing::warn!(component = "google_auth", event = "email_not_verified", email = %email);
    }
    Ok(GoogleIdentity {
        email: email.to_string(),
        email_verified,
    })
}

pub struct HttpGoogleTokenVerifier {
    client: reqwest::Client,
    client_id: String,
    token_info_url: String,
}

impl HttpGoogleTokenVerifier {
    pub fn new(client: reqwest::Client, client_id: impl Into<String>) -> Self {
        Self::with_token_info_url(client, client_id, GOOGLE_TOKEN_INFO_URL)
    }

    pub fn with_token_info_url(
        client: reqwest::Client,
        client_id: impl Into<String>,
        token_info_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            token_info_url: token_info_url.into(),
        }
    }
}

impl GoogleTokenVerifier for HttpGoogleTokenVerifier {
    fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        let client = self.client.clone();
        let url = self.token_info_url.clone();
        let id_token = id_token.to_string();
        let token_info = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .get(url)
                    .query(&[("id_token", id_token)])
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Value>()
                    .await
            })
        })
        .map_err(|error| {
            // The request URL carries the ID token as a query parameter.
            let error = error.without_url();
            tracing::error!(
                component = "google_auth",
                event = "token_info_request_failed",
                error = %error
            );
            GoogleAuthError::Request(error.to_string())
        })?;
        identity_from_token_info(&token_info, &self.client_id)
    }
}
