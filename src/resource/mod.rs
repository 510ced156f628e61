//! Resource abstraction layer
//!
//! A [`Resource`] is one configuration object of some subtype. Each subtype
//! is a plain serde struct that fixes its endpoint path; this module gives
//! every subtype the same create/read/list/update/delete behavior.
//!
//! # Architecture
//!
//! - [`Resource`] - the trait subtypes implement, with CRUD as provided methods
//! - [`objects`] - concrete subtypes (addresses, tags, services, ...)
//!
//! # Example
//!
//! ```ignore
//! use panapi::{Address, ApiSession, Resource};
//!
//! async fn example(session: &mut ApiSession) -> panapi::Result<()> {
//!     let mut address = Address::new("web-01").in_folder("Shared").fqdn("web01.example.com");
//!     address.create(session).await?;
//!     let all = address.list(session).await?;
//!     Ok(())
//! }
//! ```

pub mod objects;

pub use objects::{Address, AddressGroup, Service, ServiceGroup, Tag};

use crate::error::{Error, Result};
use crate::session::{ApiResponse, Session};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Upper bound on objects requested by a single [`Resource::list`] call
pub const LIST_LIMIT: usize = 5000;

/// Attributes that scope a request and never travel in the body
pub const TRANSPORT_FIELDS: &[&str] = &["id", "folder"];

/// Envelope for name lookups and listings
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

fn json_headers() -> Vec<(String, String)> {
    vec![("Content-Type".to_string(), "application/json".to_string())]
}

/// A configuration object that knows how to synchronize itself with the API
#[async_trait]
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    /// Path appended to the session's base URL, e.g. `/sse/config/v1/addresses`
    const ENDPOINT: &'static str;

    /// Server-assigned identifier
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: Option<String>);

    /// User-assigned lookup key
    fn name(&self) -> Option<&str>;

    /// Scope sent as a query parameter on every operation
    fn folder(&self) -> Option<&str>;

    /// Construct from an arbitrary JSON object
    fn from_attributes(attributes: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(attributes)).map_err(|source| Error::Decode {
            url: Self::ENDPOINT.to_string(),
            source,
        })
    }

    /// Snapshot of every attribute currently set
    fn attributes(&self) -> Result<Map<String, Value>> {
        let encode = |source| Error::Encode {
            endpoint: Self::ENDPOINT,
            source,
        };
        match serde_json::to_value(self).map_err(encode)? {
            Value::Object(map) => Ok(map),
            other => Err(encode(<serde_json::Error as serde::ser::Error>::custom(
                format!("expected an object, got {other}"),
            ))),
        }
    }

    /// Request body for create/update: the attributes minus `id` and `folder`
    fn payload(&self) -> Result<Value> {
        let mut attributes = self.attributes()?;
        for field in TRANSPORT_FIELDS {
            attributes.remove(*field);
        }
        Ok(Value::Object(attributes))
    }

    /// Collection URL for this subtype
    fn collection_url(base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), Self::ENDPOINT)
    }

    /// URL of this specific object, if it has an id
    fn object_url(&self, base_url: &str) -> Option<String> {
        self.id()
            .map(|id| format!("{}/{}", Self::collection_url(base_url), urlencoding::encode(id)))
    }

    /// Query parameters carrying the folder scope
    fn scope_params(&self) -> Vec<(String, String)> {
        self.folder()
            .map(|folder| vec![("folder".to_string(), folder.to_string())])
            .unwrap_or_default()
    }

    /// Create the object. On 201 the server-assigned id is stored on `self`.
    async fn create<S: Session>(&mut self, session: &mut S) -> Result<()> {
        let url = Self::collection_url(session.base_url());
        let body = self.payload()?;

        session.ensure_valid().await?;
        let sent = session
            .post(&url, json_headers(), self.scope_params(), body)
            .await;
        let response = record(session, sent)?;
        expect_status(&response, 201)?;

        let created: Value = response.json()?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        tracing::info!("Created {} {:?}", Self::ENDPOINT, id);
        self.set_id(id);
        Ok(())
    }

    /// Fetch a fresh copy, by id if set, otherwise by name
    async fn read<S: Session>(&self, session: &mut S) -> Result<Self> {
        let mut params = self.scope_params();
        let url = match (self.object_url(session.base_url()), self.name()) {
            (Some(url), _) => url,
            (None, Some(name)) => {
                params.push(("name".to_string(), name.to_string()));
                Self::collection_url(session.base_url())
            }
            (None, None) => {
                return Err(Error::MissingIdentifier {
                    operation: "read",
                    required: "name or id",
                    endpoint: Self::ENDPOINT,
                })
            }
        };

        session.ensure_valid().await?;
        let sent = session.get(&url, params).await;
        let response = record(session, sent)?;
        expect_status(&response, 200)?;

        if self.id().is_some() {
            return response.json();
        }

        let envelope: DataEnvelope<Self> = response.json()?;
        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                name: self.name().unwrap_or_default().to_string(),
                endpoint: Self::ENDPOINT,
            })
    }

    /// List objects of this subtype. The folder scope and the
    /// [`LIST_LIMIT`] cap are only sent when `folder` is set.
    async fn list<S: Session>(&self, session: &mut S) -> Result<Vec<Self>> {
        let mut params = self.scope_params();
        if !params.is_empty() {
            params.push(("limit".to_string(), LIST_LIMIT.to_string()));
        }
        let url = Self::collection_url(session.base_url());

        session.ensure_valid().await?;
        let sent = session.get(&url, params).await;
        let response = record(session, sent)?;
        expect_status(&response, 200)?;

        let envelope: DataEnvelope<Self> = response.json()?;
        tracing::debug!("Listed {} objects from {}", envelope.data.len(), Self::ENDPOINT);
        Ok(envelope.data)
    }

    /// Replace the server copy with the current attributes
    async fn update<S: Session>(&self, session: &mut S) -> Result<()> {
        let url = match self.object_url(session.base_url()) {
            Some(url) => url,
            None => {
                tracing::warn!(
                    "Updating {} without an id, sending to the collection URL",
                    Self::ENDPOINT
                );
                Self::collection_url(session.base_url())
            }
        };
        let body = self.payload()?;

        session.ensure_valid().await?;
        let sent = session
            .put(&url, json_headers(), self.scope_params(), body)
            .await;
        let response = record(session, sent)?;
        expect_status(&response, 200)?;
        response.json::<Value>()?;
        Ok(())
    }

    /// Delete the object on the server. After success the local value is
    /// stale and should be dropped by the caller.
    async fn delete<S: Session>(&self, session: &mut S) -> Result<()> {
        let url = self
            .object_url(session.base_url())
            .ok_or(Error::MissingIdentifier {
                operation: "delete",
                required: "id",
                endpoint: Self::ENDPOINT,
            })?;

        session.ensure_valid().await?;
        let sent = session
            .delete(&url, json_headers(), self.scope_params())
            .await;
        let response = record(session, sent)?;
        expect_status(&response, 200)?;
        tracing::info!("Deleted {} {:?}", Self::ENDPOINT, self.id());
        Ok(())
    }
}

/// Log a failed send, otherwise keep the raw response on the session
fn record<S: Session>(session: &mut S, sent: Result<ApiResponse>) -> Result<ApiResponse> {
    let response = sent.inspect_err(|e| {
        tracing::error!("{}", e);
    })?;
    session.set_response(response.clone());
    Ok(response)
}

fn expect_status(response: &ApiResponse, expected: u16) -> Result<()> {
    if response.status() == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedStatus {
            status: response.status(),
            url: response.url.clone(),
        })
    }
}
