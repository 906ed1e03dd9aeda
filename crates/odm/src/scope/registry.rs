//! Registry of global scopes, keyed by model type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{OdmResult, ScopeError};
use crate::model::Model;
use crate::query::Builder;

/// A scope implemented as a function of the builder and the model.
pub type ScopeFn = Arc<dyn Fn(Builder, &Model) -> Builder + Send + Sync>;

/// A scope implemented as a type.
///
/// Scope objects are registered under their type identity unless they
/// override [`Scope::identifier`].
pub trait Scope: Send + Sync {
    /// Applies the scope to a builder.
    fn apply(&self, builder: Builder, model: &Model) -> Builder;

    /// The identifier the scope is registered under.
    fn identifier(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// The three accepted registration shapes.
pub enum ScopeRegistration {
    /// A closure stored under an explicit identifier.
    Identified(String, ScopeFn),
    /// An anonymous closure, keyed by its identity.
    Closure(ScopeFn),
    /// A scope object, keyed by its type identity.
    Object(Arc<dyn Scope>),
}

impl ScopeRegistration {
    /// Registers `scope` under `identifier`.
    pub fn identified<F>(identifier: impl Into<String>, scope: F) -> Self
    where
        F: Fn(Builder, &Model) -> Builder + Send + Sync + 'static,
    {
        ScopeRegistration::Identified(identifier.into(), Arc::new(scope))
    }

    /// Registers an anonymous closure.
    pub fn closure<F>(scope: F) -> Self
    where
        F: Fn(Builder, &Model) -> Builder + Send + Sync + 'static,
    {
        ScopeRegistration::Closure(Arc::new(scope))
    }

    /// Registers a scope object.
    pub fn object<S: Scope + 'static>(scope: S) -> Self {
        ScopeRegistration::Object(Arc::new(scope))
    }
}

impl fmt::Debug for ScopeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeRegistration::Identified(id, _) => f.debug_tuple("Identified").field(id).finish(),
            ScopeRegistration::Closure(scope) => f
                .debug_tuple("Closure")
                .field(&closure_identifier(scope))
                .finish(),
            ScopeRegistration::Object(scope) => {
                f.debug_tuple("Object").field(&scope.identifier()).finish()
            }
        }
    }
}

/// A registered global scope.
#[derive(Clone)]
pub enum GlobalScope {
    /// A closure scope.
    Closure(ScopeFn),
    /// A scope object.
    Object(Arc<dyn Scope>),
}

impl GlobalScope {
    /// Applies the scope.
    pub fn apply(&self, builder: Builder, model: &Model) -> Builder {
        match self {
            GlobalScope::Closure(scope) => scope(builder, model),
            GlobalScope::Object(scope) => scope.apply(builder, model),
        }
    }
}

impl fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalScope::Closure(_) => f.write_str("GlobalScope::Closure"),
            GlobalScope::Object(scope) => write!(f, "GlobalScope::Object({})", scope.identifier()),
        }
    }
}

fn closure_identifier(scope: &ScopeFn) -> String {
    format!("closure:{:x}", Arc::as_ptr(scope) as *const () as usize)
}

/// Global scopes for every model type, in registration order.
///
/// One registry is created by the application and handed to each model
/// definition. Nothing is registered or removed implicitly.
#[derive(Default)]
pub struct ScopeRegistry {
    scopes: RwLock<HashMap<String, IndexMap<String, GlobalScope>>>,
}

impl ScopeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a global scope for `model_type` and returns its identifier.
    ///
    /// Registering under an existing identifier replaces the scope but keeps
    /// its position.
    pub fn add(&self, model_type: &str, registration: ScopeRegistration) -> OdmResult<String> {
        let (identifier, scope) = match registration {
            ScopeRegistration::Identified(identifier, scope) => {
                (identifier, GlobalScope::Closure(scope))
            }
            ScopeRegistration::Closure(scope) => {
                (closure_identifier(&scope), GlobalScope::Closure(scope))
            }
            ScopeRegistration::Object(scope) => (scope.identifier(), GlobalScope::Object(scope)),
        };

        if identifier.trim().is_empty() {
            return Err(ScopeError::InvalidRegistration {
                model_type: model_type.to_string(),
                message: "scope identifier must not be empty".to_string(),
            }
            .into());
        }

        debug!(model_type, scope = %identifier, "Registering global scope");
        self.scopes
            .write()
            .entry(model_type.to_string())
            .or_default()
            .insert(identifier.clone(), scope);

        Ok(identifier)
    }

    /// Returns true if `identifier` is registered for `model_type`.
    pub fn has(&self, model_type: &str, identifier: &str) -> bool {
        self.scopes
            .read()
            .get(model_type)
            .is_some_and(|scopes| scopes.contains_key(identifier))
    }

    /// Returns a registered scope.
    pub fn get(&self, model_type: &str, identifier: &str) -> Option<GlobalScope> {
        self.scopes
            .read()
            .get(model_type)
            .and_then(|scopes| scopes.get(identifier).cloned())
    }

    /// Returns the scopes of `model_type` in registration order.
    pub fn snapshot(&self, model_type: &str) -> Vec<(String, GlobalScope)> {
        self.scopes
            .read()
            .get(model_type)
            .map(|scopes| {
                scopes
                    .iter()
                    .map(|(id, scope)| (id.clone(), scope.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the registered identifiers of `model_type` in registration order.
    pub fn identifiers(&self, model_type: &str) -> Vec<String> {
        self.scopes
            .read()
            .get(model_type)
            .map(|scopes| scopes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Unregisters a scope. Returns true if it was registered.
    pub fn remove(&self, model_type: &str, identifier: &str) -> bool {
        self.scopes
            .write()
            .get_mut(model_type)
            .is_some_and(|scopes| scopes.shift_remove(identifier).is_some())
    }

    /// Unregisters every scope of `model_type`.
    pub fn clear(&self, model_type: &str) {
        self.scopes.write().remove(model_type);
    }

    /// Unregisters every scope of every model type.
    pub fn clear_all(&self) {
        self.scopes.write().clear();
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scopes = self.scopes.read();
        let mut map = f.debug_map();
        for (model_type, registered) in scopes.iter() {
            map.entry(model_type, &registered.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
