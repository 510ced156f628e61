//! Client for the Prisma Access (SASE) configuration API
//!
//! Every configuration object type implements [`Resource`], which gives it
//! create, read, list, update and delete against the REST API through a
//! [`Session`].
//!
//! # Module Structure
//!
//! - [`config`] - credentials file and environment overrides
//! - [`error`] - error taxonomy shared by every operation
//! - [`resource`] - the generic resource entity and concrete object types
//! - [`session`] - the session contract and the OAuth2-backed [`ApiSession`]
//!
//! # Example
//!
//! ```ignore
//! use panapi::{ApiSession, Config, Resource, Tag};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = Config::load(None)?.credentials()?;
//!     let mut session = ApiSession::connect(credentials).await?;
//!     let tags = Tag::default().in_folder("Shared").list(&mut session).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod resource;
pub mod session;

pub use config::{Config, Credentials};
pub use error::{Error, Result};
pub use resource::{Address, AddressGroup, Resource, Service, ServiceGroup, Tag};
pub use session::{ApiRequest, ApiResponse, ApiSession, Session};
