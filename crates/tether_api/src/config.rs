use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::url::DEFAULT_BASE_URL;

/// Callback invoked when the relay rejects the current token. Returns a fresh
/// access token, or `None` when the credential boundary cannot refresh.
pub type TokenRefresher = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Transport configuration for relay requests.
#[derive(Clone)]
pub struct ApiConfig {
    /// Bearer token passed to `Authorization`.
    pub access_token: String,
    /// Base URL for relay endpoints.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout for non-streaming fetches.
    pub timeout: Option<Duration>,
    /// Credential-boundary hook for one refresh-and-retry on unauthorized.
    pub token_refresher: Option<TokenRefresher>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
            token_refresher: None,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("extra_headers", &self.extra_headers)
            .field("timeout", &self.timeout)
            .field("token_refresher", &self.token_refresher.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token_refresher(mut self, refresher: TokenRefresher) -> Self {
        self.token_refresher = Some(refresher);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
