//! HTTP revocation client.
//!
//! Each application exposes a re-authentication endpoint on the host it
//! registered its redirect URI for:
//!
//! ```text
//! POST {scheme}://{host}:{port}/auth/gds/api/users/{user_id}/reauth
//! ```
//!
//! Calling it makes the application drop any session it holds for the user.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use signon_accounts::{Application, RevocationContract};
use signon_core::UserId;

use crate::{RevocationClient, RevocationConfig, RevocationOutcome};

#[derive(Debug, Error)]
pub enum RevocationClientError {
    #[error("failed to create HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// [`RevocationClient`] that calls each application's reauth endpoint.
#[derive(Debug, Clone)]
pub struct HttpRevocationClient {
    client: reqwest::Client,
}

impl HttpRevocationClient {
    /// Build a client using the timeouts from `config`.
    ///
    /// # Errors
    ///
    /// Returns `RevocationClientError::Build` if the HTTP client cannot be created.
    pub fn new(config: &RevocationConfig) -> Result<Self, RevocationClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The reauth URL for `user_id`, derived from the contract's redirect URI.
    ///
    /// Only scheme, host and port of the redirect URI are kept.
    pub fn revocation_url(contract: &RevocationContract, user_id: UserId) -> Result<Url, String> {
        let redirect = Url::parse(contract.redirect_uri.trim())
            .map_err(|e| format!("invalid redirect uri {:?}: {e}", contract.redirect_uri))?;

        let host = redirect
            .host_str()
            .ok_or_else(|| format!("redirect uri {:?} has no host", contract.redirect_uri))?;
        let port = redirect
            .port_or_known_default()
            .ok_or_else(|| format!("redirect uri {:?} has no port", contract.redirect_uri))?;

        let url = format!(
            "{}://{}:{}/auth/gds/api/users/{}/reauth",
            redirect.scheme(),
            host,
            port,
            user_id
        );
        Url::parse(&url).map_err(|e| format!("invalid revocation url {url:?}: {e}"))
    }
}

#[async_trait]
impl RevocationClient for HttpRevocationClient {
    async fn revoke(&self, user_id: UserId, application: &Application) -> RevocationOutcome {
        let url = match Self::revocation_url(&application.contract, user_id) {
            Ok(url) => url,
            Err(reason) => return RevocationOutcome::failure(application.id, reason),
        };

        debug!(application = %application.name, url = %url, "sending revocation request");

        let mut request = self.client.post(url);
        if let Some(token) = &application.contract.bearer_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => RevocationOutcome::Success,
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                // The application never knew this user; nothing left to revoke.
                debug!(application = %application.name, "no access to revoke");
                RevocationOutcome::Success
            }
            Ok(response) => RevocationOutcome::failure(
                application.id,
                format!("unexpected status {}", response.status()),
            ),
            Err(e) if e.is_timeout() => RevocationOutcome::failure(application.id, "timeout"),
            Err(e) => RevocationOutcome::failure(application.id, format!("request failed: {e}")),
        }
    }
}
