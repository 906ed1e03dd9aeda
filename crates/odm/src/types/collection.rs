//! Hydrated search results.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::response::{SearchEnvelope, ShardReport, TotalHits};
use crate::error::OdmResult;
use crate::model::{Model, ModelDefinition};

/// Models of one search response plus its envelope metadata.
///
/// A read-only snapshot: nothing here talks to the cluster again.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    models: Vec<Model>,
    total: Option<TotalHits>,
    max_score: Option<f64>,
    took: Option<u64>,
    timed_out: bool,
    scroll_id: Option<String>,
    shards: Option<ShardReport>,
    suggestions: Option<Value>,
    aggregations: Option<Value>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Hydrates every hit of a raw response into a model of `definition`.
    ///
    /// Fires `retrieved` for each model.
    pub fn from_response(definition: &Arc<ModelDefinition>, response: Value) -> OdmResult<Self> {
        let envelope = SearchEnvelope::parse(response)?;

        let models = envelope
            .hits
            .hits
            .iter()
            .map(|hit| Model::from_hit(definition.clone(), hit))
            .collect();

        Ok(Self {
            models,
            total: envelope.hits.total,
            max_score: envelope.hits.max_score,
            took: envelope.took,
            timed_out: envelope.timed_out,
            scroll_id: envelope.scroll_id,
            shards: envelope.shards,
            suggestions: envelope.suggest,
            aggregations: envelope.aggregations,
        })
    }

    /// Number of models in this page of results.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if the response held no hits.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterates the models in hit order.
    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    /// Returns the first model.
    pub fn first(&self) -> Option<&Model> {
        self.models.first()
    }

    /// Returns the model at `position`.
    pub fn get(&self, position: usize) -> Option<&Model> {
        self.models.get(position)
    }

    /// Returns the models.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Consumes the collection, returning the models.
    pub fn into_models(self) -> Vec<Model> {
        self.models
    }

    /// Total matching documents; falls back to the page length when the
    /// response carried no total.
    pub fn total(&self) -> u64 {
        self.total
            .as_ref()
            .map(TotalHits::value)
            .unwrap_or(self.models.len() as u64)
    }

    /// The raw `hits.total`.
    pub fn total_hits(&self) -> Option<&TotalHits> {
        self.total.as_ref()
    }

    #[allow(missing_docs)]
    pub fn max_score(&self) -> Option<f64> {
        self.max_score
    }

    /// Server-side duration in milliseconds.
    pub fn took(&self) -> Option<u64> {
        self.took
    }

    #[allow(missing_docs)]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    #[allow(missing_docs)]
    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    #[allow(missing_docs)]
    pub fn shards(&self) -> Option<&ShardReport> {
        self.shards.as_ref()
    }

    #[allow(missing_docs)]
    pub fn suggestions(&self) -> Option<&Value> {
        self.suggestions.as_ref()
    }

    #[allow(missing_docs)]
    pub fn aggregations(&self) -> Option<&Value> {
        self.aggregations.as_ref()
    }

    /// Returns a single aggregation result by name.
    pub fn aggregation(&self, name: &str) -> Option<&Value> {
        self.aggregations.as_ref().and_then(|aggs| aggs.get(name))
    }

    /// Returns each model's document body.
    pub fn to_documents(&self) -> Vec<Value> {
        self.models.iter().map(Model::to_document).collect()
    }

    /// Deserializes every model into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> OdmResult<Vec<T>> {
        self.models.iter().map(Model::to_typed).collect()
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
