//! OAuth2 client-credentials grant against Microsoft Entra ID.

use std::time::{Duration, Instant};

use azmon_core::{ClientError, ClientResult};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ArmError, ArmResult};
use crate::options::ClientOptions;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Client-secret credential with an in-memory token cache.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        for (what, value) in [("tenant ID", tenant_id), ("client ID", client_id), ("client secret", client_secret)] {
            if value.is_empty() {
                return Err(ArmError::Credential(format!("{what} is empty")));
            }
        }

        Ok(Self {
            http,
            token_url: format!(
                "{}/{tenant_id}/oauth2/v2.0/token",
                options.authority_host.trim_end_matches('/')
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: options.scope(),
            cached: Mutex::new(None),
        })
    }

    /// A bearer token valid for at least [`REFRESH_MARGIN`].
    pub async fn token(&self) -> ClientResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() + REFRESH_MARGIN < token.expires_at
        {
            return Ok(token.token.clone());
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn request_token(&self) -> ClientResult<CachedToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Auth(format!("malformed token response: {e}")))?;
        debug!(expires_in = token.expires_in, "acquired access token");

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_rejected() {
        let options = ClientOptions::default();
        let err = ClientSecretCredential::new(reqwest::Client::new(), "tenant", "", "secret", &options).unwrap_err();
        assert!(matches!(err, ArmError::Credential(m) if m.contains("client ID")));
    }

    #[test]
    fn token_url_from_authority_and_tenant() {
        let options = ClientOptions {
            authority_host: "https://login.example/".to_string(),
            ..Default::default()
        };
        let credential =
            ClientSecretCredential::new(reqwest::Client::new(), "tenant", "client", "secret", &options).unwrap();
        assert_eq!(credential.token_url, "https://login.example/tenant/oauth2/v2.0/token");
        assert_eq!(credential.scope, "https://management.azure.com/.default");
        assert!(!format!("{credential:?}").contains("client_secret"));
    }
}
