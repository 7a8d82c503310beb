/*!
 * # Commerce Platform Access Tokens
 *
 * The commerce platform API is called with bearer tokens obtained through the
 * OAuth2 client-credentials grant, one token per configured project.
 *
 * ## Flow
 *
 * 1. A caller asks for the token of a project
 * 2. A cached token is returned while it is still fresh
 * 3. Otherwise the token endpoint `{auth_url}/oauth/token` is called with the
 *    project's client id and secret and the result is cached
 *
 * Concurrent callers for the same project wait on one in-flight request
 * instead of each requesting a token.
 */

use dashmap::DashMap;
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, ClientId, ClientSecret, Scope,
    TokenResponse, TokenUrl,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::config::CtpProjectConfig;
use crate::errors::ServiceError;

/// Tokens are treated as stale this long before they actually expire
const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);
/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}

type TokenSlot = Arc<Mutex<Option<CachedToken>>>;

/// Client-credentials token cache keyed by project key
#[derive(Debug)]
pub struct CtpTokenProvider {
    tokens: DashMap<String, TokenSlot>,
    refresh_margin: Duration,
}

impl Default for CtpTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CtpTokenProvider {
    pub fn new() -> Self {
        Self::with_refresh_margin(DEFAULT_REFRESH_MARGIN)
    }

    pub fn with_refresh_margin(refresh_margin: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            refresh_margin,
        }
    }

    /// Returns a bearer token for the project, requesting a new one when the
    /// cached token is missing or about to expire.
    #[instrument(skip(self, project), fields(project_key = %project.project_key))]
    pub async fn access_token(&self, project: &CtpProjectConfig) -> Result<String, ServiceError> {
        // Clone the slot out so the map shard is not held across the await
        let slot = {
            let entry = self
                .tokens
                .entry(project.project_key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)));
            Arc::clone(entry.value())
        };

        let mut cached = slot.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(self.refresh_margin)) {
            debug!("Using cached access token");
            return Ok(token.access_token.clone());
        }

        let token = self.request_token(project).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token after the API rejected `rejected_token`.
    ///
    /// The slot stays in place and is only cleared while it still holds the
    /// rejected token, so a refresh that is in flight or already done is kept.
    pub async fn invalidate(&self, project_key: &str, rejected_token: &str) {
        let slot = match self.tokens.get(project_key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return,
        };

        let mut cached = slot.lock().await;
        if cached
            .as_ref()
            .is_some_and(|token| token.access_token == rejected_token)
        {
            *cached = None;
            info!(project_key, "Invalidated cached access token");
        }
    }

    async fn request_token(&self, project: &CtpProjectConfig) -> Result<CachedToken, ServiceError> {
        let base = project.auth_url.trim_end_matches('/');
        let client = BasicClient::new(
            ClientId::new(project.client_id.clone()),
            Some(ClientSecret::new(project.client_secret.clone())),
            AuthUrl::new(format!("{}/oauth/authorize", base))
                .map_err(|e| ServiceError::Configuration(e.to_string()))?,
            Some(
                TokenUrl::new(format!("{}/oauth/token", base))
                    .map_err(|e| ServiceError::Configuration(e.to_string()))?,
            ),
        );

        let response = client
            .exchange_client_credentials()
            .add_scope(Scope::new(project.scope()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                error!(project_key = %project.project_key, "Token request failed: {}", e);
                ServiceError::UpstreamUnavailable(format!(
                    "could not obtain an access token for project {}",
                    project.project_key
                ))
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        info!(
            project_key = %project.project_key,
            expires_in_secs = lifetime.as_secs(),
            "Obtained access token"
        );

        Ok(CachedToken {
            access_token: response.access_token().secret().clone(),
            expires_at: Instant::now() + lifetime,
        })
    }
}
