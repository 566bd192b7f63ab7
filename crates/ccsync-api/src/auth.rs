// Token authentication for the intent API.
//
// `POST /dna/system/api/v1/auth/token` with HTTP basic auth returns a
// short-lived token that every later request carries as `X-Auth-Token`.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::{CatalystClient, preview};
use crate::error::Error;
use crate::models::TokenResponse;

const TOKEN_PATH: &str = "dna/system/api/v1/auth/token";

/// Username/password pair used to mint tokens.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// A bearer token issued by the controller.
#[derive(Debug, Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl CatalystClient {
    /// Exchange credentials for a fresh token.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthToken, Error> {
        let url = self.url(TOKEN_PATH)?;
        debug!(username = %credentials.username, "requesting auth token");

        let resp = self
            .http()
            .post(url)
            .basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            )
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: if body.is_empty() {
                    format!("controller rejected credentials (HTTP {status})")
                } else {
                    format!("HTTP {status}: {}", preview(&body))
                },
            });
        }

        let token: TokenResponse = self.handle_response(resp).await?;
        debug!("auth token issued");
        Ok(AuthToken::new(token.token))
    }
}
