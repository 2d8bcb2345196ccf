//! # centreon-api - a client for the Centreon v2 REST API
//!
//! This crate lets a caller authenticate against a Centreon monitoring
//! platform, then enumerate, filter, create, update, and delete
//! monitoring objects (hosts, services, acknowledgements, downtimes, ...)
//! without hand-building HTTP calls. It is built on `reqwest` and exposes
//! results as lazily fetched, typed [`Record`]s.
//!
//! ## Quick Start
//!
//! ```no_run
//! use centreon_api::{Api, Filter, SortOrder};
//!
//! #[tokio::main]
//! async fn main() -> centreon_api::Result<()> {
//!     let api = Api::builder()
//!         .url("https://centreon.example.com/centreon")?
//!         .build()?;
//!
//!     // Exchange credentials for a token; it is stored on the handle.
//!     api.create_token("admin", "secret").await?;
//!
//!     // Iterate over every monitored host, pages fetched as needed.
//!     let hosts = api.monitoring().endpoint("hosts");
//!     let mut listing = hosts.all();
//!     while let Some(host) = listing.try_next().await? {
//!         println!("{}", host);
//!     }
//!
//!     // Narrow, sort, and page explicitly.
//!     let page = hosts
//!         .filter(
//!             Filter::new()
//!                 .field("host_name", "db-01")
//!                 .sort("host.name", SortOrder::Asc)
//!                 .limit(10)
//!                 .page(2),
//!         )?
//!         .collect()
//!         .await?;
//!     println!("{} matches on page 2", page.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Lazy enumeration** - [`RecordSet`] fetches pages as they are
//!   consumed; with no explicit limit it retrieves the full listing in
//!   one follow-up call after discovering the total
//! - **Change-tracked records** - [`Record`] snapshots every entity at
//!   construction, so [`Record::updates`] yields exactly the fields a
//!   PATCH payload needs
//! - **Batch writes** - create, update, and delete all take batches and
//!   issue a single call
//! - **Classified errors** - conflicts ([`Error::Allocation`]),
//!   request failures ([`Error::Request`]), misbehaving endpoints
//!   ([`Error::Content`]), and caller mistakes ([`Error::Usage`]) are
//!   distinct; a missing record is `Ok(None)`, never an error
//! - **Structured logging** - every request and classification is traced
//!   via `tracing`
//!
//! ## Reading and writing
//!
//! ```no_run
//! use centreon_api::{Api, Filter};
//! use serde_json::{json, Map, Value};
//!
//! # async fn example() -> centreon_api::Result<()> {
//! # let api = Api::builder().url("https://ctn")?.build()?;
//! let hosts = api.configuration().endpoint("hosts");
//!
//! // Exactly-one lookup by filter; zero matches is None, two is an error.
//! if let Some(mut host) = hosts.get_by(Filter::new().field("name", "db-01")).await? {
//!     host.set("alias", "primary database");
//!     hosts.update([host]).await?;
//! }
//!
//! // Create, then delete by identifier.
//! let new_host: Map<String, Value> = serde_json::from_value(json!({
//!     "monitoring_server_id": 2,
//!     "name": "db-02",
//!     "address": "10.0.0.12",
//! }))
//! .unwrap();
//! let created = hosts.create(new_host).await?;
//! hosts.delete([created]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! The crate performs no retries and keeps no local state beyond two
//! write-once caches (an endpoint's `choices` metadata and a record
//! set's total count); the remote server is the source of truth. TLS
//! verification is **off by default** — see
//! [`ApiBuilder::verify_tls`] — because Centreon installations commonly
//! run on self-signed certificates.

mod api;
mod endpoint;
mod error;
mod query;
mod record;
mod transport;

pub use api::{Api, ApiBuilder, App};
pub use endpoint::{Deletable, Endpoint, Filter, Updatable};
pub use error::{Error, Result};
pub use query::{RecordSet, SortOrder, DEFAULT_PAGE_SIZE};
pub use record::{FieldValue, Record, RecordKind};
