//! Global and named scopes.
//!
//! Global scopes are registered per model type on an explicit
//! [`ScopeRegistry`] and applied once, when a query is constructed, in
//! registration order. Named scopes live on the model definition and are
//! applied on demand through [`Builder::scope`](crate::query::Builder::scope).

mod registry;

pub use registry::{GlobalScope, Scope, ScopeFn, ScopeRegistration, ScopeRegistry};
