//! Top-level client and its builder.
//!
//! # Design
//! `ShiftAiClient` owns one `Arc<Transport>` and hands a clone of it to each
//! facade accessor. Clones of the client share the transport and therefore
//! one connection pool, which is released when the last clone is dropped.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use url::Url;

use crate::api::{
    AgentsApi, AnalyticsApi, ConversationsApi, InternalApi, MessagesApi, PlatformApi,
    PlatformSessionApi, UsersApi,
};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default overall request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the base URL for [`ShiftAiClient::from_env`].
pub const BASE_URL_ENV: &str = "SHIFTAI_BASE_URL";

/// Environment variable holding the API key for [`ShiftAiClient::from_env`].
pub const API_KEY_ENV: &str = "SHIFTAI_API_KEY";

/// ShiftAI platform client.
///
/// # Example
///
/// ```no_run
/// use shiftai_core::{HumanMessage, PlatformRegistrationRequest, ShiftAiClient};
///
/// # async fn example() -> shiftai_core::Result<()> {
/// let client = ShiftAiClient::new("http://localhost:8081", None)?;
/// let registration = client
///     .platform()
///     .register(PlatformRegistrationRequest {
///         project_name: "support-bot".to_string(),
///         metadata: None,
///     })
///     .await?;
///
/// let client = client.with_api_key(registration.api_key.unwrap_or_default())?;
/// let response = client
///     .messages()
///     .send_human_message(HumanMessage::new(
///         "alice", "Hello", "Helper", "OpenAI", "4.0", "alice@example.com",
///     ))
///     .await?;
/// println!("conversation: {:?}", response.conversation_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ShiftAiClient {
    transport: Arc<Transport>,
    settings: Arc<ClientBuilder>,
}

impl ShiftAiClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client with default timeouts.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let mut builder = Self::builder().base_url(base_url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    /// Build a client from `SHIFTAI_BASE_URL` and, if set, `SHIFTAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| Error::Config(format!("{BASE_URL_ENV} is not set")))?;
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self::new(&base_url, api_key)
    }

    /// A new client with the same settings and the given API key, typically
    /// the one returned by platform registration.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder {
            api_key: Some(api_key.into()),
            ..(*self.settings).clone()
        }
        .build()
    }

    /// Normalized base URL, without a trailing `/`.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn has_api_key(&self) -> bool {
        self.transport.has_api_key()
    }

    /// The shared transport, for endpoints without a dedicated facade.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn platform(&self) -> PlatformApi {
        PlatformApi::new(Arc::clone(&self.transport))
    }

    pub fn messages(&self) -> MessagesApi {
        MessagesApi::new(Arc::clone(&self.transport))
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(Arc::clone(&self.transport))
    }

    pub fn agents(&self) -> AgentsApi {
        AgentsApi::new(Arc::clone(&self.transport))
    }

    pub fn analytics(&self) -> AnalyticsApi {
        AnalyticsApi::new(Arc::clone(&self.transport))
    }

    pub fn conversations(&self) -> ConversationsApi {
        ConversationsApi::new(Arc::clone(&self.transport))
    }

    pub fn platform_session(&self) -> PlatformSessionApi {
        PlatformSessionApi::new(Arc::clone(&self.transport))
    }

    /// Admin and observability endpoints.
    pub fn internal(&self) -> InternalApi {
        InternalApi::new(Arc::clone(&self.transport))
    }
}

/// Builder for [`ShiftAiClient`].
#[derive(Clone)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: Option<String>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Base URL of the backend, e.g. `http://localhost:8081`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// API key sent as `Api-Key` on authenticated calls.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<ShiftAiClient> {
        let base_url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Precondition("baseUrl is required".to_string()))?;

        Url::parse(base_url).map_err(|e| Error::Config(format!("invalid base URL {base_url:?}: {e}")))?;

        if let Some(key) = &self.api_key {
            HeaderValue::from_str(key)
                .map_err(|_| Error::Config("API key is not a valid header value".to_string()))?;
        }

        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("shiftai-core/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let transport = Transport::new(http, base_url, self.api_key.clone());
        Ok(ShiftAiClient {
            transport: Arc::new(transport),
            settings: Arc::new(self),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
