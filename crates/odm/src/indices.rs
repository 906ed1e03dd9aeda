//! Index management.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::connection::Connection;
use crate::error::OdmResult;

/// Settings, mappings and aliases of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfiguration {
    /// Index settings, e.g. `{"number_of_shards": 1}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    /// Field mappings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Value>,
    /// Aliases by name.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub aliases: Map<String, Value>,
}

impl IndexConfiguration {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of primary and replica shards.
    pub fn shards(mut self, primaries: u32, replicas: u32) -> Self {
        let settings = self.settings.get_or_insert_with(|| json!({}));
        if let Value::Object(settings) = settings {
            settings.insert("number_of_shards".to_string(), json!(primaries));
            settings.insert("number_of_replicas".to_string(), json!(replicas));
        }
        self
    }

    /// Sets the mappings.
    pub fn mappings(mut self, mappings: Value) -> Self {
        self.mappings = Some(mappings);
        self
    }

    /// Adds an alias.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.insert(name.into(), json!({}));
        self
    }

    /// Returns the create-index request body.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(ref settings) = self.settings {
            body.insert("settings".to_string(), settings.clone());
        }
        if let Some(ref mappings) = self.mappings {
            body.insert("mappings".to_string(), mappings.clone());
        }
        if !self.aliases.is_empty() {
            body.insert("aliases".to_string(), Value::Object(self.aliases.clone()));
        }
        Value::Object(body)
    }
}

impl Connection {
    /// Creates an index.
    pub async fn create_index(
        &self,
        index: &str,
        configuration: &IndexConfiguration,
    ) -> OdmResult<Value> {
        info!(index, "Creating index");
        self.transport()
            .indices()
            .create(json!({ "index": index, "body": configuration.to_body() }))
            .await
    }

    /// Deletes an index.
    pub async fn drop_index(&self, index: &str) -> OdmResult<Value> {
        info!(index, "Dropping index");
        self.transport()
            .indices()
            .delete(json!({ "index": index }))
            .await
    }

    /// Returns whether an index exists.
    pub async fn index_exists(&self, index: &str) -> OdmResult<bool> {
        self.transport()
            .indices()
            .exists(json!({ "index": index }))
            .await
    }

    /// Replaces the mapping of an index.
    pub async fn put_mapping(&self, index: &str, mappings: Value) -> OdmResult<Value> {
        info!(index, "Updating index mapping");
        self.transport()
            .indices()
            .put_mapping(json!({ "index": index, "body": mappings }))
            .await
    }

    /// Applies alias actions, e.g. `[{"add": {"index": "posts_v2", "alias": "posts"}}]`.
    pub async fn update_aliases(&self, actions: Vec<Value>) -> OdmResult<Value> {
        info!(actions = actions.len(), "Updating aliases");
        self.transport()
            .indices()
            .update_aliases(json!({ "body": { "actions": actions } }))
            .await
    }
}
