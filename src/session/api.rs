//! API Session
//!
//! Authenticates with the OAuth2 client-credentials grant and performs
//! requests against the configuration API with the resulting bearer token.

use super::{ApiRequest, ApiResponse, Session};
use crate::config::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Token expiry buffer - treat tokens as expired this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// TTL used when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl AccessToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Session against the configuration API
pub struct ApiSession {
    client: Client,
    credentials: Credentials,
    token: Option<AccessToken>,
    response: Option<ApiResponse>,
}

impl ApiSession {
    /// Create a new session. No token is fetched until the first operation.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("panapi/", env!("CARGO_PKG_VERSION")))
            .timeout(credentials.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            token: None,
            response: None,
        })
    }

    /// Create a session and authenticate immediately
    pub async fn connect(credentials: Credentials) -> Result<Self> {
        let mut session = Self::new(credentials)?;
        session.reauthenticate().await?;
        Ok(session)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn bearer(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(|t| t.value.as_str())
            .ok_or_else(|| Error::Auth("no access token, call reauthenticate first".to_string()))
    }
}

#[async_trait]
impl Session for ApiSession {
    fn is_expired(&self) -> bool {
        !self.token.as_ref().is_some_and(AccessToken::is_valid)
    }

    async fn reauthenticate(&mut self) -> Result<()> {
        let url = self.credentials.token_url.as_str();
        tracing::debug!("POST {} (client credentials grant)", url);

        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.credentials.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Auth(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            tracing::error!("Token error: {} - {}", status, sanitize_for_log(&body));
            return Err(Error::Auth(format!("token endpoint returned {status}")));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("invalid token response: {e}")))?;

        let ttl = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        tracing::debug!(
            "New token cached, expires in ~{} seconds",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs()
        );

        self.token = Some(AccessToken {
            value: token.access_token,
            expires_at,
        });
        Ok(())
    }

    async fn send(&mut self, request: ApiRequest) -> Result<ApiResponse> {
        tracing::debug!("{} {}", request.method, request.url);

        let token = self.bearer()?;
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(token);

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let transport = |source: reqwest::Error| Error::Transport {
            url: request.url.clone(),
            source: Box::new(source),
        };

        let response = builder.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;

        let response = ApiResponse::new(status, request.url, body);
        if !response.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response.body));
        }
        Ok(response)
    }

    fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    fn set_response(&mut self, response: ApiResponse) {
        self.response = Some(response);
    }

    fn base_url(&self) -> &str {
        self.credentials.base_url.as_str()
    }
}
