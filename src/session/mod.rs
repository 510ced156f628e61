//! Session collaborator
//!
//! A [`Session`] owns authentication state and the raw HTTP transport.
//! Resource operations only ever talk to the API through this trait, which
//! keeps them testable against an in-memory session.
//!
//! # Module Structure
//!
//! - [`api`] - [`ApiSession`], the reqwest-backed session with OAuth2 login

pub mod api;

pub use api::ApiSession;

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default base URL for the configuration API
pub const DEFAULT_BASE_URL: &str = "https://api.sase.paloaltonetworks.com";

/// A single request handed to the session
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response as received from the API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body; an empty body reads as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|source| Error::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Authentication state plus transport, as consumed by resource operations
///
/// The expiry check and reauthentication are not synchronized; a session
/// shared between concurrent callers has to guard that itself.
#[async_trait]
pub trait Session: Send {
    /// True when the held credentials can no longer be used
    fn is_expired(&self) -> bool;

    /// Obtain fresh credentials. May be called any number of times.
    async fn reauthenticate(&mut self) -> Result<()>;

    /// Perform one request
    async fn send(&mut self, request: ApiRequest) -> Result<ApiResponse>;

    /// Most recent raw response, kept for inspection
    fn response(&self) -> Option<&ApiResponse>;

    fn set_response(&mut self, response: ApiResponse);

    /// Base URL resource endpoints are appended to
    fn base_url(&self) -> &str {
        DEFAULT_BASE_URL
    }

    /// Reauthenticate if the session has expired
    async fn ensure_valid(&mut self) -> Result<()> {
        if self.is_expired() {
            tracing::debug!("Session expired, reauthenticating");
            self.reauthenticate().await?;
        }
        Ok(())
    }

    async fn get(&mut self, url: &str, params: Vec<(String, String)>) -> Result<ApiResponse> {
        self.send(ApiRequest::new(Method::GET, url).params(params))
            .await
    }

    async fn post(
        &mut self,
        url: &str,
        headers: Vec<(String, String)>,
        params: Vec<(String, String)>,
        body: Value,
    ) -> Result<ApiResponse> {
        self.send(
            ApiRequest::new(Method::POST, url)
                .headers(headers)
                .params(params)
                .json(body),
        )
        .await
    }

    async fn put(
        &mut self,
        url: &str,
        headers: Vec<(String, String)>,
        params: Vec<(String, String)>,
        body: Value,
    ) -> Result<ApiResponse> {
        self.send(
            ApiRequest::new(Method::PUT, url)
                .headers(headers)
                .params(params)
                .json(body),
        )
        .await
    }

    async fn delete(
        &mut self,
        url: &str,
        headers: Vec<(String, String)>,
        params: Vec<(String, String)>,
    ) -> Result<ApiResponse> {
        self.send(
            ApiRequest::new(Method::DELETE, url)
                .headers(headers)
                .params(params),
        )
        .await
    }
}
