//! Remote API Gateway
//!
//! All traffic to the game backend flows through [`ApiGateway`], which owns
//! the credential lifecycle: calls lazily exchange a token when none is held,
//! attach it as the `authorization` header, and react to HTTP 401 by
//! invalidating the token and retrying, bounded by [`MAX_AUTH_ATTEMPTS`].
//!
//! Two seams keep this testable without a network:
//! - [`GameApi`] is what the orchestrator consumes (mocked in state-machine
//!   tests),
//! - [`HttpTransport`] is the wire boundary below the retry policy
//!   (scripted in the retry tests here), implemented for real traffic by
//!   [`ReqwestTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::credentials::CredentialStore;
use crate::error::GatewayError;
use crate::identity::IdentityResolver;
use crate::scoring::Play;

/// Platform identifier sent with every identity-scoped call
pub const PLATFORM: &str = "TOKO";

/// Category reported with every play submission
pub const PLAY_CATEGORY: &str = "Matches";

/// Maximum re-authentication attempts for a single logical call
pub const MAX_AUTH_ATTEMPTS: u32 = 3;

// ============================================================================
// Wire types
// ============================================================================

/// HTTP method of an API request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
}

/// A request to the game backend, relative to the configured base URL
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path relative to the base URL, without a leading slash
    pub endpoint: String,
    /// Query string parameters
    pub query: Vec<(String, String)>,
    /// JSON body, for POST requests
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Build a GET request for the given endpoint
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Build a POST request for the given endpoint
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A decoded response from the game backend
#[derive(Clone, Debug)]
pub struct ApiReply {
    /// The HTTP status code
    pub status: u16,
    /// The JSON body, `Value::Null` when the body was absent or not JSON
    pub body: Value,
}

/// Wire boundary below the authentication/retry policy
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one HTTP request, attaching `token` as the bearer credential
    /// when present. Non-2xx statuses are returned, not errors; only
    /// transport-level failures error.
    async fn send(&self, request: &ApiRequest, token: Option<&str>)
        -> Result<ApiReply, GatewayError>;
}

// ============================================================================
// Reqwest transport
// ============================================================================

/// [`HttpTransport`] backed by a shared [`reqwest::Client`]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build the transport from configuration
    ///
    /// The client carries the browser-imitation headers the remote expects
    /// on every call; a header value that fails validation is skipped with
    /// a warning rather than aborting startup.
    #[must_use]
    pub fn new(config: &BotConfig) -> Self {
        let mut headers = HeaderMap::new();
        let static_headers = [
            ("user-agent", config.user_agent.as_str()),
            ("referer", config.referer.as_str()),
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", "en-US,en;q=0.9"),
            ("sec-ch-ua-platform", "\"Android\""),
            ("sec-fetch-site", "same-origin"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-dest", "empty"),
        ];
        for (name, value) in static_headers {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.insert(name, v);
                }
                Err(e) => {
                    warn!(error = %e, header = name, "Skipping invalid header value");
                }
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiReply, GatewayError> {
        let url = format!("{}/{}", self.base_url, request.endpoint);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header("authorization", token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed {
                endpoint: request.endpoint.clone(),
                source: e,
            })?;

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        debug!(endpoint = %request.endpoint, status, "API call completed");
        Ok(ApiReply { status, body })
    }
}

// ============================================================================
// Game API
// ============================================================================

/// Remote game state observed by a fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Current energy balance; a missing field reads as zero
    pub energy: u64,
}

/// Result of a play submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayReward {
    /// Energy balance after the play, when the response carried one
    pub energy: Option<u64>,
}

/// The game operations the orchestrator drives
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Fetch the current game state for the configured user
    async fn fetch_state(&self) -> Result<GameSnapshot, GatewayError>;

    /// Submit one play result. Not idempotent; callers must not retry a
    /// failed submission.
    async fn submit_play(&self, play: &Play) -> Result<PlayReward, GatewayError>;
}

/// Authenticated gateway to the game backend
pub struct ApiGateway {
    transport: Arc<dyn HttpTransport>,
    store: CredentialStore,
    identity: IdentityResolver,
    user_id: Option<String>,
    game_id: u32,
    token: RwLock<Option<String>>,
}

impl ApiGateway {
    /// Build a gateway with the real HTTP transport
    #[must_use]
    pub fn new(config: &BotConfig) -> Self {
        Self::with_transport(
            Arc::new(ReqwestTransport::new(config)),
            CredentialStore::new(&config.token_file),
            IdentityResolver::new(&config.init_data_file),
            config.game.game_id,
        )
    }

    /// Build a gateway over an arbitrary transport
    ///
    /// Loads any persisted token and resolves the user identity once; an
    /// unresolvable identity is tolerated here and surfaces later as
    /// [`GatewayError::IdentityMissing`] from identity-scoped calls.
    #[must_use]
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
        identity: IdentityResolver,
        game_id: u32,
    ) -> Self {
        let token = store.load();
        let user_id = identity.resolve();
        if token.is_some() {
            debug!("Using persisted token");
        }
        Self {
            transport,
            store,
            identity,
            user_id,
            game_id,
            token: RwLock::new(token),
        }
    }

    /// The resolved user id, if identity resolution succeeded
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Exchange the init-data payload for a fresh token
    ///
    /// Called directly by [`ensure_token`](Self::ensure_token); runs outside
    /// the 401 retry loop, so an exchange failure surfaces immediately.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenExchange`] when no init data is
    /// available or the remote refuses the exchange, and
    /// [`GatewayError::MalformedResponse`] when the reply lacks a token.
    pub async fn exchange_token(&self) -> Result<String, GatewayError> {
        let raw = self.identity.raw().ok_or_else(|| {
            GatewayError::TokenExchange("no init data available for exchange".to_string())
        })?;

        let request = ApiRequest::get("user/getToken")
            .with_query("initDataRaw", raw)
            .with_query("platform", PLATFORM);

        let reply = self.transport.send(&request, None).await?;
        if !(200..300).contains(&reply.status) {
            return Err(GatewayError::TokenExchange(format!(
                "remote rejected exchange with HTTP {}",
                reply.status
            )));
        }

        let token = reply.body["data"]["token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::MalformedResponse {
                endpoint: request.endpoint.clone(),
                reason: "no token in response data".to_string(),
            })?
            .to_string();

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "Failed to persist token, continuing with in-memory copy");
        }
        *self.token.write().await = Some(token.clone());
        info!("Acquired fresh token");

        Ok(token)
    }

    /// Return the held token, exchanging for a fresh one when none is held
    async fn ensure_token(&self) -> Result<String, GatewayError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.exchange_token().await
    }

    /// Run one logical call through the bounded re-authentication loop
    async fn execute(&self, request: ApiRequest) -> Result<Value, GatewayError> {
        for attempt in 0..MAX_AUTH_ATTEMPTS {
            let token = self.ensure_token().await?;
            let reply = self.transport.send(&request, Some(&token)).await?;

            if reply.status == 401 {
                warn!(
                    endpoint = %request.endpoint,
                    attempt = attempt + 1,
                    "Token rejected, invalidating and re-authenticating"
                );
                *self.token.write().await = None;
                continue;
            }

            return check_reply(&request.endpoint, &reply);
        }

        Err(GatewayError::MaxRetriesExceeded(MAX_AUTH_ATTEMPTS))
    }

    /// Render the user id the way the remote expects it: numeric when it
    /// parses as a number, a string otherwise
    fn user_id_value(id: &str) -> Value {
        id.parse::<u64>().map_or_else(|_| json!(id), |n| json!(n))
    }
}

/// Validate a non-401 reply: HTTP status then logical `status` field
fn check_reply(endpoint: &str, reply: &ApiReply) -> Result<Value, GatewayError> {
    if !(200..300).contains(&reply.status) {
        return Err(GatewayError::HttpStatus {
            endpoint: endpoint.to_string(),
            status: reply.status,
        });
    }

    let status = reply.body["status"].as_str().unwrap_or("<missing>");
    if status != "OK" {
        return Err(GatewayError::LogicalError {
            endpoint: endpoint.to_string(),
            status: status.to_string(),
        });
    }

    Ok(reply.body.clone())
}

#[async_trait]
impl GameApi for ApiGateway {
    async fn fetch_state(&self) -> Result<GameSnapshot, GatewayError> {
        let user_id = self.user_id.as_ref().ok_or(GatewayError::IdentityMissing)?;

        let request = ApiRequest::get("game/getUserGameInfo")
            .with_query("userId", user_id.clone())
            .with_query("gameId", self.game_id.to_string())
            .with_query("platform", PLATFORM);

        let body = self.execute(request).await?;
        let energy = body["data"]["userCurrentEnergy"].as_u64().unwrap_or(0);

        Ok(GameSnapshot { energy })
    }

    async fn submit_play(&self, play: &Play) -> Result<PlayReward, GatewayError> {
        let user_id = self.user_id.as_ref().ok_or(GatewayError::IdentityMissing)?;

        let request = ApiRequest::post("game/playGameGetReward").with_body(json!({
            "categories": PLAY_CATEGORY,
            "userId": Self::user_id_value(user_id),
            "platform": PLATFORM,
            "gameId": self.game_id,
            "score": play.score,
            "multiplier": play.multiplier,
        }));

        let body = self.execute(request).await?;
        let energy = body["data"]["userCurrentEnergy"].as_u64();

        info!(score = play.score, multiplier = %play.multiplier, "Play submitted");
        Ok(PlayReward { energy })
    }
}

// ============================================================================
// Tests
// ============================================================================
