//! # Mirror Engine
//!
//! A client-held mirror of a remote record collection.
//!
//! This crate keeps a local copy of records served by a remote store, shows
//! a paged, sorted and filtered window of it, tracks local edits against the
//! last synchronized state and pushes them back on demand.
//!
//! ## Design Principles
//!
//! - **Transport agnostic**: the engine never opens a socket; a [`Transport`]
//!   executes every remote call
//! - **Explicit changes**: edits are recorded through [`DataSource::add`],
//!   [`DataSource::update`] and [`DataSource::remove`], never detected
//! - **Minimal sync**: contradictory edits cancel before anything is sent
//!
//! ## Core Concepts
//!
//! ### Full Set and View
//!
//! The full set holds every record retrieved from the remote store plus the
//! items added locally. The view is derived from it by [`compute_view`]:
//! filter, stable sort, then the `[(page - 1) * page_size, page * page_size)`
//! slice. Both are [`Observable`] containers.
//!
//! ### Change Set
//!
//! The [`ChangeTracker`] sorts local mutations into three disjoint
//! collections:
//! - **Added** - items created locally, sent with a create call
//! - **Updated** - items whose fields differ from the baseline, sent with an
//!   update call
//! - **Removed** - items deleted locally, sent with a destroy call
//!
//! ### Templates
//!
//! A [`Template`] declares the fields new items carry and how each default
//! is copied. It is compiled once into a [`CompiledTemplate`].
//!
//! ## Quick Start
//!
//! ```rust
//! use mirror_engine::{transport_fn, DataSource, DataSourceConfig, RemoteOp, Request, TransportError};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let transport = transport_fn(|request: Request| async move {
//!     match request.operation {
//!         RemoteOp::Read => Ok(json!([
//!             {"Id": 0, "FirstName": "Antonio"},
//!             {"Id": 1, "FirstName": "Mihaela"},
//!         ])),
//!         _ => Ok::<_, TransportError>(request.payload),
//!     }
//! });
//!
//! // 1. Configure the endpoints
//! let config = DataSourceConfig::new()
//!     .with_read("people/read")
//!     .with_update("people/update")
//!     .with_page_size(1);
//! let mut source = DataSource::new(config, transport).unwrap();
//!
//! // 2. Fetch a page
//! source.fetch(vec![]).await.unwrap();
//! assert_eq!(source.data().len(), 2);
//! assert_eq!(source.view()[0]["FirstName"], "Antonio");
//!
//! // 3. Edit a copy and write it back
//! let mut item = source.data()[0].clone();
//! item.set("City", "Sofia");
//! source.update(item).unwrap();
//! assert!(source.has_changes());
//!
//! // 4. Push the change
//! let report = source.sync().await.unwrap();
//! assert_eq!(report.updated.len(), 1);
//! assert!(!source.has_changes());
//! # }
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod observable;
pub mod operation;
pub mod query;
pub mod source;
pub mod sync;
pub mod template;
pub mod tracker;
pub mod transport;
pub mod window;

// Re-export main types at crate root
pub use config::{ConfigError, DataSourceConfig, Endpoint, DEFAULT_METHOD};
pub use error::{Error, Result, SyncFailure};
pub use item::{DataItem, FieldMap, ItemKey, DEFAULT_ID_ATTRIBUTE};
pub use observable::{Observable, SubscriptionId};
pub use operation::{ReadParams, RemoteOp, Request};
pub use query::{Direction, Filter, QueryState, SortKey};
pub use source::{DataSource, ItemRef, SourceState};
pub use sync::{plan, PayloadRules, PlannedOp, SyncReport};
pub use template::{CompiledTemplate, FieldDescriptor, FieldKind, Template};
pub use tracker::{ChangeSummary, ChangeTracker};
pub use transport::{transport_fn, FnTransport, Transport, TransportError};
pub use window::{compare_items, compute_view};
