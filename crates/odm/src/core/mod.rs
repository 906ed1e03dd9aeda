//! Collaborator traits.
//!
//! The mapper only assembles and interprets request/response bodies. Talking
//! to the cluster, caching raw responses and resolving the current page of an
//! inbound request are delegated to the collaborators defined here:
//!
//! - [`Transport`] / [`IndicesTransport`] - execute requests against the cluster
//! - [`Cache`] - key-value storage for raw search responses
//! - [`PageResolver`] - current page lookup for pagination

pub mod cache;
pub mod request_context;
pub mod transport;

pub use cache::{Cache, CacheLookup, CacheTtl, MemoryCache};
pub use request_context::{FixedPage, PageResolver};
pub use transport::{IndicesTransport, Transport};
