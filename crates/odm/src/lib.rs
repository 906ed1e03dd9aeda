//! Helios Elasticsearch Object-Document Mapper
//!
//! This crate maps Elasticsearch documents onto model instances and provides a
//! fluent query builder that compiles chained conditions into the bool-query
//! DSL.
//!
//! # Features
//!
//! - **Fluent queries**: `where`-style conditions, full-text, geo, nested and
//!   pinned queries, sorting, highlighting, aggregations and suggestions
//! - **Scopes**: global scopes applied to every query of a model type, plus
//!   named scopes invoked on demand
//! - **Models**: attribute dirty tracking, mass-assignment protection and
//!   halting lifecycle events around save and delete
//! - **Execution**: pagination, scroll cursors, response caching and bulk
//!   requests
//!
//! # Architecture
//!
//! - [`query`] - request body assembly, condition translation, the builder
//! - [`scope`] - the global scope registry
//! - [`model`] - model definitions, instances and lifecycle events
//! - [`types`] - hydrated collections, pagination and response envelopes
//! - [`core`] - transport, cache and page resolver collaborators
//! - [`backends`] - concrete transports
//! - [`indices`] - index management
//! - [`config`] - connection configuration
//! - [`error`] - error types for all operations
//!
//! # Request bodies
//!
//! Clauses accumulate per boolean group and compile in a fixed order:
//!
//! ```
//! use helios_odm::query::{Clause, ClauseGroup, RequestBody, SortDirection};
//! use serde_json::json;
//!
//! let mut body = RequestBody::new();
//! body.add(ClauseGroup::Filter, Clause::term("status", json!("published")));
//! body.add(ClauseGroup::MustNot, Clause::exists("deleted_at"));
//! body.sort("created_at", SortDirection::Descending);
//!
//! assert_eq!(
//!     body.compile(),
//!     json!({
//!         "query": {"bool": {
//!             "filter": [{"term": {"status": "published"}}],
//!             "must_not": [{"exists": {"field": "deleted_at"}}]
//!         }},
//!         "sort": [{"created_at": {"order": "desc"}}]
//!     })
//! );
//! ```
//!
//! # Conditions
//!
//! ```
//! use helios_odm::query::{ClauseGroup, Condition};
//! use serde_json::json;
//!
//! let (group, clause) = Condition::from_operator("views", ">=", json!(10)).translate(false);
//! assert_eq!(group, ClauseGroup::Filter);
//! assert_eq!(clause.to_value(), json!({"range": {"views": {"gte": 10}}}));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod indices;
pub mod model;
pub mod query;
pub mod scope;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{ConnectionConfig, ElasticsearchAuth};
pub use connection::Connection;
pub use error::{OdmError, OdmResult};
pub use indices::IndexConfiguration;
pub use model::{EventOutcome, Model, ModelDefinition, ModelEvent};
pub use query::{Builder, Bulk, RegexpFlags, RegexpOptions, SubQuery};
pub use scope::{Scope, ScopeRegistration, ScopeRegistry};
pub use types::{Collection, Pagination};

// Re-export collaborator traits
pub use core::{
    Cache, CacheLookup, CacheTtl, FixedPage, IndicesTransport, MemoryCache, PageResolver, Transport,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
