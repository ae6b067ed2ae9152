use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AppCredentials, SessionStore};
use crate::constants::OAUTH_SCOPE;
use crate::error::{AppError, AuthError};
use crate::session::prompt::CredentialPrompt;
use crate::transport::http_client::MastodonHttpClient;

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    scope: String,
}

/// Owns the application credentials and the mutable session store, and
/// hands out authenticated client handles rebuilt from stored state.
pub struct Session {
    credentials: AppCredentials,
    store: SessionStore,
}

impl Session {
    pub fn new(credentials: AppCredentials, store: SessionStore) -> Self {
        Self { credentials, store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Returns an authenticated client handle, logging in interactively
    /// when no access token is cached. The token is exchanged at most once
    /// and persisted before use; a cached token never prompts.
    pub async fn connect<P: CredentialPrompt>(
        &mut self,
        prompt: &P,
    ) -> Result<MastodonHttpClient, AuthError> {
        if self.store.ensure_section() {
            self.store.save()?;
        }

        let token = match self.store.access_token() {
            Some(token) => token.to_string(),
            None => {
                let token = self.log_in(prompt).await?;
                self.store.set_access_token(token.clone());
                self.store.save()?;
                token
            }
        };

        // Rebuilt from stored state on every call.
        Ok(MastodonHttpClient::new(
            &self.credentials.instance,
            Some(&token),
        )?)
    }

    async fn log_in(&self, prompt: &impl CredentialPrompt) -> Result<String, AuthError> {
        info!("Logging into {}...", self.credentials.instance);
        let client = MastodonHttpClient::new(&self.credentials.instance, None)?;

        let username = prompt.username()?;
        let password = prompt.password()?;

        let request = TokenRequest {
            grant_type: "password",
            client_id: &self.credentials.client_key,
            client_secret: &self.credentials.client_secret,
            username: &username,
            password: &password,
            scope: OAUTH_SCOPE,
        };

        let response: TokenResponse = client
            .post_form("/oauth/token", &request)
            .await
            .map_err(|e| match e {
                AppError::Unauthorized => AuthError::BadCredentials,
                AppError::Unexpected(status) if status == StatusCode::BAD_REQUEST => {
                    AuthError::BadCredentials
                }
                other => AuthError::from(other),
            })?;

        debug!("Obtained access token (scope: {})", response.scope);
        Ok(response.access_token)
    }
}
