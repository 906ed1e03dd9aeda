//! Model entities and their lifecycle.
//!
//! A [`Model`] is one document: its attributes with dirty tracking, the
//! response metadata it was hydrated with (`_id`, `_index`, `_score`,
//! highlights), and whether it exists in the index. Behaviour shared by all
//! documents of a type lives on the [`ModelDefinition`].
//!
//! # Lifecycle
//!
//! ```text
//! new ──fill──▶ filled ──save (insert)──▶ persisted ◀──save (update)── dirty
//!                                            │  ▲                        ▲
//!                                            │  └────────────────────────┘
//!                                            └──delete──▶ deleted
//! ```

mod attributes;
mod definition;
mod events;
mod guard;

pub use attributes::AttributeStore;
pub use definition::{ModelDefinition, ModelDefinitionBuilder, NamedScope};
pub use events::{EventDispatcher, EventOutcome, Listener, ModelEvent};
pub use guard::MassAssignmentGuard;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ModelError, OdmError, OdmResult};
use crate::query::Builder;

/// Response fields of a hit that are not document attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMetadata {
    /// `_id`
    pub id: Option<String>,
    /// `_index`
    pub index: Option<String>,
    /// `_score`
    pub score: Option<f64>,
    /// `highlight`
    pub highlight: Option<Value>,
}

/// A single document.
#[derive(Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    attributes: AttributeStore,
    metadata: ResultMetadata,
    exists: bool,
    was_recently_created: bool,
}

impl Model {
    /// Creates a blank, unsaved model.
    pub fn new(definition: Arc<ModelDefinition>) -> Self {
        Self {
            definition,
            attributes: AttributeStore::new(),
            metadata: ResultMetadata::default(),
            exists: false,
            was_recently_created: false,
        }
    }

    /// Hydrates a model from a search hit and fires `retrieved`.
    ///
    /// `_source` becomes the attributes; requested `fields` are merged on
    /// top. The model is marked as existing and clean.
    pub fn from_hit(definition: Arc<ModelDefinition>, hit: &Value) -> Self {
        let mut model = Self::new(definition);

        let mut attributes = match hit.get("_source") {
            Some(Value::Object(source)) => source.clone(),
            _ => Map::new(),
        };
        if let Some(Value::Object(fields)) = hit.get("fields") {
            for (key, value) in fields {
                attributes.insert(key.clone(), value.clone());
            }
        }
        model.attributes.replace(attributes);

        model.metadata = ResultMetadata {
            id: hit.get("_id").and_then(value_to_id),
            index: hit.get("_index").and_then(Value::as_str).map(str::to_string),
            score: hit.get("_score").and_then(Value::as_f64),
            highlight: hit.get("highlight").cloned(),
        };
        model.exists = true;
        model.attributes.sync_original();

        let definition = model.definition.clone();
        definition.fire(ModelEvent::Retrieved, &mut model);
        model
    }

    /// Creates an unsaved model from a serializable value, bypassing the
    /// mass-assignment guard.
    pub fn from_typed<T: Serialize>(
        definition: Arc<ModelDefinition>,
        value: &T,
    ) -> OdmResult<Self> {
        let model_type = definition.model_type().to_string();
        let document = serde_json::to_value(value).map_err(|e| ModelError::Hydration {
            model_type,
            message: e.to_string(),
        })?;

        let mut model = Self::new(definition);
        model.force_fill(document)?;
        Ok(model)
    }

    /// The model definition.
    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    /// The model type tag.
    pub fn model_type(&self) -> &str {
        self.definition.model_type()
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Mass-assigns attributes through the guard.
    ///
    /// Keys that are not fillable are skipped, unless the model is totally
    /// guarded, in which case the first such key fails the whole fill and
    /// nothing is assigned.
    pub fn fill(&mut self, attributes: Value) -> OdmResult<&mut Self> {
        let attributes = self.expect_object(attributes)?;
        let guard = self.definition.guard();

        if guard.is_totally_guarded() {
            if let Some(key) = attributes.keys().find(|key| !guard.is_fillable(key)) {
                return Err(ModelError::MassAssignment {
                    model_type: self.model_type().to_string(),
                    key: key.clone(),
                }
                .into());
            }
        }

        for (key, value) in attributes {
            if guard.is_fillable(&key) {
                self.attributes.set(key, value);
            } else {
                debug!(model_type = %self.model_type(), key = %key, "Skipping guarded attribute");
            }
        }
        Ok(self)
    }

    /// Assigns attributes without consulting the guard.
    pub fn force_fill(&mut self, attributes: Value) -> OdmResult<&mut Self> {
        let attributes = self.expect_object(attributes)?;
        for (key, value) in attributes {
            self.attributes.set(key, value);
        }
        Ok(self)
    }

    fn expect_object(&self, attributes: Value) -> OdmResult<Map<String, Value>> {
        match attributes {
            Value::Object(map) => Ok(map),
            other => Err(ModelError::Hydration {
                model_type: self.model_type().to_string(),
                message: format!("expected an attribute object, got {}", other),
            }
            .into()),
        }
    }

    /// Returns an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns an attribute deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> OdmResult<Option<T>> {
        self.attributes
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    OdmError::from(ModelError::Hydration {
                        model_type: self.model_type().to_string(),
                        message: format!("attribute [{}]: {}", key, e),
                    })
                })
            })
            .transpose()
    }

    /// Sets an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.set(key, value.into());
        self
    }

    /// Removes an attribute.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.attributes.unset(key)
    }

    /// Returns true if the attribute is set.
    pub fn has(&self, key: &str) -> bool {
        self.attributes.has(key)
    }

    /// Returns every attribute.
    pub fn attributes(&self) -> &Map<String, Value> {
        self.attributes.all()
    }

    /// Returns true if any attribute changed since the last sync.
    pub fn is_dirty(&self) -> bool {
        self.attributes.is_dirty()
    }

    /// Returns true if `key` changed since the last sync.
    pub fn is_dirty_key(&self, key: &str) -> bool {
        self.attributes.is_dirty_key(key)
    }

    /// Returns true if nothing changed since the last sync.
    pub fn is_clean(&self) -> bool {
        !self.is_dirty()
    }

    /// Returns true if the last save changed anything.
    pub fn was_changed(&self) -> bool {
        !self.attributes.changes().is_empty()
    }

    /// Returns true if the last save changed `key`.
    pub fn was_changed_key(&self, key: &str) -> bool {
        self.attributes.changes().contains_key(key)
    }

    /// Returns the attributes changed since the last sync.
    pub fn get_dirty(&self) -> Map<String, Value> {
        self.attributes.dirty()
    }

    /// Returns the attributes changed by the last save.
    pub fn get_changes(&self) -> &Map<String, Value> {
        self.attributes.changes()
    }

    /// Returns the last synced value of an attribute.
    pub fn get_original(&self, key: &str) -> Option<&Value> {
        self.attributes.original(key)
    }

    /// Checkpoints the current attributes as clean.
    pub fn sync_original(&mut self) -> &mut Self {
        self.attributes.sync_original();
        self
    }

    /// Records the current dirty attributes as the last changes.
    pub fn sync_changes(&mut self) -> &mut Self {
        self.attributes.sync_changes();
        self
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// The document id.
    pub fn id(&self) -> Option<&str> {
        self.metadata.id.as_deref()
    }

    /// Sets the document id used on the next save.
    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.metadata.id = Some(id.into());
        self
    }

    /// The index the document was read from or written to.
    pub fn index(&self) -> Option<&str> {
        self.metadata.index.as_deref().or(self.definition.index())
    }

    /// Overrides the index used for this document.
    pub fn set_index(&mut self, index: impl Into<String>) -> &mut Self {
        self.metadata.index = Some(index.into());
        self
    }

    /// The relevance score of the hit.
    pub fn score(&self) -> Option<f64> {
        self.metadata.score
    }

    /// The highlight fragments of the hit.
    pub fn highlight(&self) -> Option<&Value> {
        self.metadata.highlight.as_ref()
    }

    /// All response metadata.
    pub fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    /// Whether the document is persisted.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Whether the document was inserted by this instance.
    pub fn was_recently_created(&self) -> bool {
        self.was_recently_created
    }

    // ------------------------------------------------------------------
    // Conversion
    // ------------------------------------------------------------------

    /// Returns the attributes as a document body.
    pub fn to_document(&self) -> Value {
        Value::Object(self.attributes.all().clone())
    }

    /// Deserializes the attributes into `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> OdmResult<T> {
        serde_json::from_value(self.to_document()).map_err(|e| {
            ModelError::Hydration {
                model_type: self.model_type().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Returns an unsaved copy without the `except` attributes and without
    /// an id. Fires `replicating` on the copy.
    pub fn replicate(&self, except: &[&str]) -> Model {
        let mut copy = Model::new(self.definition.clone());
        for (key, value) in self.attributes.all() {
            if !except.contains(&key.as_str()) && key != "_id" {
                copy.attributes.set(key.clone(), value.clone());
            }
        }
        copy.metadata.index = self.metadata.index.clone();

        self.definition.fire(ModelEvent::Replicating, &mut copy);
        copy
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// A scoped query for this model type.
    pub fn new_query(&self) -> Builder {
        self.definition.new_query()
    }

    fn write_query(&self) -> Builder {
        let mut query = self.definition.new_query_without_scopes();
        if let Some(index) = self.index() {
            query = query.index(index);
        }
        if let Some(id) = self.id() {
            query = query.id(id);
        }
        query
    }

    /// Saves the model: an update of the dirty attributes if it exists, an
    /// insert of every attribute otherwise. An existing model with removed
    /// attributes is reindexed whole under its id.
    ///
    /// Saving a clean existing model makes no request. Returns `Ok(false)` if
    /// a listener halted the save.
    pub async fn save(&mut self) -> OdmResult<bool> {
        let definition = self.definition.clone();
        if definition.fire(ModelEvent::Saving, self) == EventOutcome::Halt {
            return Ok(false);
        }

        let saved = if self.exists {
            self.perform_update(&definition).await?
        } else {
            self.perform_insert(&definition).await?
        };

        if saved {
            definition.fire(ModelEvent::Saved, self);
            self.attributes.sync_original();
        }
        Ok(saved)
    }

    async fn perform_update(&mut self, definition: &Arc<ModelDefinition>) -> OdmResult<bool> {
        if self.is_clean() {
            return Ok(true);
        }

        if definition.fire(ModelEvent::Updating, self) == EventOutcome::Halt {
            return Ok(false);
        }

        if self.id().is_none() {
            return Err(ModelError::MissingIdentifier {
                model_type: self.model_type().to_string(),
                operation: "update".to_string(),
            }
            .into());
        }

        let removed = self.attributes.removed();
        if removed.is_empty() {
            let dirty = self.get_dirty();
            self.write_query().update(Value::Object(dirty)).await?;
        } else {
            // Partial updates cannot drop keys.
            debug!(removed = ?removed, "Reindexing document to drop removed attributes");
            let mut document = self.attributes.all().clone();
            document.shift_remove("_id");
            self.write_query().insert(Value::Object(document), None).await?;
        }
        self.attributes.sync_changes();

        definition.fire(ModelEvent::Updated, self);
        Ok(true)
    }

    async fn perform_insert(&mut self, definition: &Arc<ModelDefinition>) -> OdmResult<bool> {
        if definition.fire(ModelEvent::Creating, self) == EventOutcome::Halt {
            return Ok(false);
        }

        if self.metadata.id.is_none() {
            self.metadata.id = self.attributes.get("_id").and_then(value_to_id);
        }

        let mut document = self.attributes.all().clone();
        document.shift_remove("_id");

        let response = self
            .write_query()
            .insert(Value::Object(document), None)
            .await?;

        if self.metadata.id.is_none() {
            self.metadata.id = response.get("_id").and_then(value_to_id);
        }
        if self.metadata.index.is_none() {
            self.metadata.index = response
                .get("_index")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        self.exists = true;
        self.was_recently_created = true;
        self.attributes.clear_changes();

        definition.fire(ModelEvent::Created, self);
        Ok(true)
    }

    /// Fills and saves the model.
    pub async fn update(&mut self, attributes: Value) -> OdmResult<bool> {
        self.fill(attributes)?;
        self.save().await
    }

    /// Deletes the model.
    ///
    /// Returns `Ok(false)` without a request if the model does not exist, and
    /// `Ok(false)` if a listener halted the deletion.
    pub async fn delete(&mut self) -> OdmResult<bool> {
        if !self.exists {
            return Ok(false);
        }
        if self.id().is_none() {
            return Err(ModelError::MissingIdentifier {
                model_type: self.model_type().to_string(),
                operation: "delete".to_string(),
            }
            .into());
        }

        let definition = self.definition.clone();
        if definition.fire(ModelEvent::Deleting, self) == EventOutcome::Halt {
            return Ok(false);
        }

        self.write_query().delete().await?;
        self.exists = false;

        definition.fire(ModelEvent::Deleted, self);
        Ok(true)
    }

    /// Reloads the document from the index as a new instance.
    pub async fn fresh(&self) -> OdmResult<Option<Model>> {
        let Some(id) = self.id() else {
            return Ok(None);
        };
        if !self.exists {
            return Ok(None);
        }

        let mut query = self.definition.new_query_without_scopes();
        if let Some(index) = self.index() {
            query = query.index(index);
        }
        query.find(id).await
    }

    /// Reloads the attributes of this instance from the index.
    pub async fn refresh(&mut self) -> OdmResult<&mut Self> {
        match self.fresh().await? {
            Some(fresh) => {
                self.attributes.replace(fresh.attributes.all().clone());
                self.attributes.sync_original();
                self.metadata = fresh.metadata;
                Ok(self)
            }
            None => Err(ModelError::NotFound {
                model_type: self.model_type().to_string(),
                ids: self.id().map(str::to_string).into_iter().collect(),
                filters: Vec::new(),
            }
            .into()),
        }
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("model_type", &self.model_type())
            .field("attributes", self.attributes.all())
            .field("metadata", &self.metadata)
            .field("exists", &self.exists)
            .finish()
    }
}
