//! Transport collaborator traits.
//!
//! Every method receives a parameter map shaped like the official client
//! parameters (`index`, `id`, `body`, `from`, `size`, `scroll`, `client`, ...)
//! and returns the raw decoded response body.

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OdmResult;

/// Executes requests against the search engine.
///
/// Implementations are expected to honour `client.ignore`: a list of HTTP
/// status codes whose error responses are returned as ordinary bodies
/// instead of failing the call.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Runs a search request.
    async fn search(&self, params: Value) -> OdmResult<Value>;

    /// Counts documents matching a query. Responds with `{"count": n}`.
    async fn count(&self, params: Value) -> OdmResult<Value>;

    /// Indexes (creates or replaces) a single document.
    async fn index(&self, params: Value) -> OdmResult<Value>;

    /// Partially updates a single document.
    async fn update(&self, params: Value) -> OdmResult<Value>;

    /// Deletes a single document.
    async fn delete(&self, params: Value) -> OdmResult<Value>;

    /// Sends a bulk request. `params.body` holds the alternating
    /// metadata/payload lines.
    async fn bulk(&self, params: Value) -> OdmResult<Value>;

    /// Continues a scroll cursor.
    async fn scroll(&self, params: Value) -> OdmResult<Value>;

    /// Releases one or more scroll cursors.
    async fn clear_scroll(&self, params: Value) -> OdmResult<Value>;

    /// Returns the index management namespace.
    fn indices(&self) -> &dyn IndicesTransport;
}

/// Index management requests.
#[async_trait]
pub trait IndicesTransport: Send + Sync {
    /// Creates an index with optional settings, mappings and aliases.
    async fn create(&self, params: Value) -> OdmResult<Value>;

    /// Deletes an index.
    async fn delete(&self, params: Value) -> OdmResult<Value>;

    /// Returns whether an index exists.
    async fn exists(&self, params: Value) -> OdmResult<bool>;

    /// Updates the mapping of an index.
    async fn put_mapping(&self, params: Value) -> OdmResult<Value>;

    /// Atomically applies alias actions.
    async fn update_aliases(&self, params: Value) -> OdmResult<Value>;
}
