//! Model definitions.
//!
//! A [`ModelDefinition`] plays the part of a model class: it names the model
//! type, binds it to an index and a connection, and owns the mass-assignment
//! guard, lifecycle listeners and named scopes shared by every instance.
//! Global scopes live on the injected [`ScopeRegistry`], keyed by the model
//! type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::Model;
use super::events::{EventDispatcher, EventOutcome, ModelEvent};
use super::guard::MassAssignmentGuard;
use crate::connection::Connection;
use crate::error::{ModelError, OdmResult};
use crate::query::Builder;
use crate::scope::{GlobalScope, Scope, ScopeRegistration, ScopeRegistry};
use crate::types::Collection;

/// A named scope: receives the builder and the call arguments.
pub type NamedScope = Arc<dyn Fn(Builder, &[Value]) -> Builder + Send + Sync>;

/// Describes one model type.
pub struct ModelDefinition {
    model_type: String,
    index: Option<String>,
    connection: Arc<Connection>,
    scopes: Arc<ScopeRegistry>,
    events: EventDispatcher,
    guard: MassAssignmentGuard,
    named_scopes: HashMap<String, NamedScope>,
}

/// Builder for [`ModelDefinition`].
pub struct ModelDefinitionBuilder {
    model_type: String,
    index: Option<String>,
    guard: MassAssignmentGuard,
    named_scopes: HashMap<String, NamedScope>,
    events: EventDispatcher,
}

impl ModelDefinitionBuilder {
    /// Sets the index the model is stored in.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Sets the mass-assignable keys.
    pub fn fillable<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guard = self.guard.with_fillable(keys);
        self
    }

    /// Sets the guarded keys.
    pub fn guarded<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guard = self.guard.with_guarded(keys);
        self
    }

    /// Switches mass-assignment protection off.
    pub fn unguarded(mut self) -> Self {
        self.guard = MassAssignmentGuard::unguarded();
        self
    }

    /// Registers a named scope, invoked through [`Builder::scope`].
    pub fn named_scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(Builder, &[Value]) -> Builder + Send + Sync + 'static,
    {
        self.named_scopes.insert(name.into(), Arc::new(scope));
        self
    }

    /// Registers a lifecycle listener.
    pub fn listen<F>(self, event: ModelEvent, listener: F) -> Self
    where
        F: Fn(&mut Model) -> EventOutcome + Send + Sync + 'static,
    {
        self.events.listen(event, listener);
        self
    }

    /// Finishes the definition and boots it.
    ///
    /// `booting` and `booted` are fired on a blank instance.
    pub fn build(
        self,
        connection: Arc<Connection>,
        scopes: Arc<ScopeRegistry>,
    ) -> Arc<ModelDefinition> {
        let definition = Arc::new(ModelDefinition {
            model_type: self.model_type,
            index: self.index,
            connection,
            scopes,
            events: self.events,
            guard: self.guard,
            named_scopes: self.named_scopes,
        });

        let mut blank = definition.new_model();
        definition.fire(ModelEvent::Booting, &mut blank);
        debug!(model_type = %definition.model_type, "Booted model definition");
        definition.fire(ModelEvent::Booted, &mut blank);

        definition
    }
}

impl ModelDefinition {
    /// Starts a definition for `model_type`.
    pub fn builder(model_type: impl Into<String>) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder {
            model_type: model_type.into(),
            index: None,
            guard: MassAssignmentGuard::default(),
            named_scopes: HashMap::new(),
            events: EventDispatcher::new(),
        }
    }

    /// The model type tag.
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// The index documents are stored in.
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// The connection queries run on.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// The global scope registry.
    pub fn scopes(&self) -> &Arc<ScopeRegistry> {
        &self.scopes
    }

    /// The lifecycle event dispatcher.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// The mass-assignment guard.
    pub fn guard(&self) -> &MassAssignmentGuard {
        &self.guard
    }

    /// Registers a lifecycle listener.
    pub fn listen<F>(&self, event: ModelEvent, listener: F)
    where
        F: Fn(&mut Model) -> EventOutcome + Send + Sync + 'static,
    {
        self.events.listen(event, listener);
    }

    pub(crate) fn fire(&self, event: ModelEvent, model: &mut Model) -> EventOutcome {
        self.events.dispatch(event, model)
    }

    /// Returns a named scope.
    pub fn named_scope(&self, name: &str) -> Option<NamedScope> {
        self.named_scopes.get(name).cloned()
    }

    /// Returns true if a named scope is defined.
    pub fn has_named_scope(&self, name: &str) -> bool {
        self.named_scopes.contains_key(name)
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Creates a blank, unsaved instance.
    pub fn new_model(self: &Arc<Self>) -> Model {
        Model::new(self.clone())
    }

    /// Creates an unsaved instance filled with `attributes`.
    pub fn make(self: &Arc<Self>, attributes: Value) -> OdmResult<Model> {
        let mut model = self.new_model();
        model.fill(attributes)?;
        Ok(model)
    }

    /// Creates, fills and saves an instance.
    ///
    /// Fails with [`ModelError::SaveHalted`] if a listener halts the save.
    pub async fn create(self: &Arc<Self>, attributes: Value) -> OdmResult<Model> {
        let mut model = self.make(attributes)?;
        if !model.save().await? {
            return Err(ModelError::SaveHalted {
                model_type: self.model_type.clone(),
            }
            .into());
        }
        Ok(model)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// A builder with every global scope applied.
    pub fn new_query(self: &Arc<Self>) -> Builder {
        self.new_query_without_scopes().apply_global_scopes()
    }

    /// A builder with no global scope applied.
    pub fn new_query_without_scopes(self: &Arc<Self>) -> Builder {
        Builder::new(self.new_model())
    }

    /// A builder with every global scope except `identifier` applied.
    pub fn without_global_scope(self: &Arc<Self>, identifier: impl Into<String>) -> Builder {
        self.new_query_without_scopes()
            .without_global_scope(identifier)
            .apply_global_scopes()
    }

    /// A builder with every global scope except `identifiers` applied.
    pub fn without_global_scopes<I, S>(self: &Arc<Self>, identifiers: I) -> Builder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.new_query_without_scopes()
            .without_global_scopes(identifiers)
            .apply_global_scopes()
    }

    /// A builder with every currently registered global scope removed.
    pub fn without_all_global_scopes(self: &Arc<Self>) -> Builder {
        self.new_query_without_scopes()
            .without_all_global_scopes()
            .apply_global_scopes()
    }

    /// Runs the scoped query.
    pub async fn all(self: &Arc<Self>) -> OdmResult<Collection> {
        self.new_query().get().await
    }

    /// Looks up a document by id.
    pub async fn find(self: &Arc<Self>, id: impl Into<String>) -> OdmResult<Option<Model>> {
        self.new_query().find(id).await
    }

    /// Looks up a document by id, failing when it does not exist.
    pub async fn find_or_fail(self: &Arc<Self>, id: impl Into<String>) -> OdmResult<Model> {
        self.new_query().find_or_fail(id).await
    }

    /// Resolves an inbound route value to a model by `field` (`_id` by default).
    pub async fn resolve_route_binding(
        self: &Arc<Self>,
        value: &str,
        field: Option<&str>,
    ) -> OdmResult<Option<Model>> {
        match field.unwrap_or("_id") {
            "_id" => self.find(value).await,
            field => {
                self.new_query()
                    .first_where(field.to_string(), value.to_string())
                    .await
            }
        }
    }

    // ------------------------------------------------------------------
    // Global scopes
    // ------------------------------------------------------------------

    /// Registers a global scope and returns its identifier.
    pub fn add_global_scope(&self, registration: ScopeRegistration) -> OdmResult<String> {
        self.scopes.add(&self.model_type, registration)
    }

    /// Registers a closure under an explicit identifier.
    pub fn add_global_scope_fn<F>(
        &self,
        identifier: impl Into<String>,
        scope: F,
    ) -> OdmResult<String>
    where
        F: Fn(Builder, &Model) -> Builder + Send + Sync + 'static,
    {
        self.add_global_scope(ScopeRegistration::identified(identifier, scope))
    }

    /// Registers an anonymous closure, keyed by its identity.
    pub fn add_global_closure<F>(&self, scope: F) -> OdmResult<String>
    where
        F: Fn(Builder, &Model) -> Builder + Send + Sync + 'static,
    {
        self.add_global_scope(ScopeRegistration::closure(scope))
    }

    /// Registers a scope object, keyed by its type identity.
    pub fn add_global_scope_object<S: Scope + 'static>(&self, scope: S) -> OdmResult<String> {
        self.add_global_scope(ScopeRegistration::object(scope))
    }

    /// Returns true if a global scope is registered under `identifier`.
    pub fn has_global_scope(&self, identifier: &str) -> bool {
        self.scopes.has(&self.model_type, identifier)
    }

    /// Returns a registered global scope.
    pub fn global_scope(&self, identifier: &str) -> Option<GlobalScope> {
        self.scopes.get(&self.model_type, identifier)
    }

    /// Returns the registered global scope identifiers in registration order.
    pub fn global_scopes(&self) -> Vec<String> {
        self.scopes.identifiers(&self.model_type)
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("model_type", &self.model_type)
            .field("index", &self.index)
            .field("guard", &self.guard)
            .field("events", &self.events)
            .field("named_scopes", &self.named_scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}
