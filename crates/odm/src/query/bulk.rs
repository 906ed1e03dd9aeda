//! Bulk request builder.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::core::Transport;
use crate::error::{OdmResult, QueryError};

/// Accumulates index/update/delete actions into one bulk request body.
///
/// Each action targets the pending index/id set through [`Bulk::index`] and
/// [`Bulk::id`], which reset after the action is appended. The index falls
/// back to the default the bulk was created with. When an automatic commit
/// fails, the action that triggered it stays pending with the others.
#[derive(Debug)]
pub struct Bulk {
    transport: Arc<dyn Transport>,
    default_index: Option<String>,
    pending_index: Option<String>,
    pending_id: Option<String>,
    body: Vec<Value>,
    operation_count: usize,
    autocommit_after: Option<usize>,
    ignores: BTreeSet<u16>,
}

impl Bulk {
    /// Creates an empty bulk builder.
    pub fn new(transport: Arc<dyn Transport>, default_index: Option<String>) -> Self {
        Self {
            transport,
            default_index,
            pending_index: None,
            pending_id: None,
            body: Vec::new(),
            operation_count: 0,
            autocommit_after: None,
            ignores: BTreeSet::new(),
        }
    }

    /// Commits automatically whenever `operations` actions have accumulated.
    pub fn autocommit_after(mut self, operations: usize) -> Self {
        self.autocommit_after = (operations > 0).then_some(operations);
        self
    }

    /// Treats the given HTTP status codes as non-fatal on commit.
    pub fn ignore<I: IntoIterator<Item = u16>>(mut self, codes: I) -> Self {
        self.ignores.extend(codes);
        self
    }

    /// Sets the index of the next action.
    pub fn index(&mut self, index: impl Into<String>) -> &mut Self {
        self.pending_index = Some(index.into());
        self
    }

    /// Sets the document id of the next action.
    pub fn id(&mut self, id: impl Into<String>) -> &mut Self {
        self.pending_id = Some(id.into());
        self
    }

    /// Appends an `index` action.
    pub async fn insert(&mut self, document: Value) -> OdmResult<&mut Self> {
        self.append("index", Some(document), false).await
    }

    /// Appends an `update` action with a partial document.
    pub async fn update(&mut self, fields: Value) -> OdmResult<&mut Self> {
        self.append("update", Some(json!({ "doc": fields })), true)
            .await
    }

    /// Appends a `delete` action.
    pub async fn delete(&mut self) -> OdmResult<&mut Self> {
        self.append("delete", None, true).await
    }

    async fn append(
        &mut self,
        action: &str,
        payload: Option<Value>,
        require_id: bool,
    ) -> OdmResult<&mut Self> {
        let index = self.pending_index.take().or_else(|| self.default_index.clone());
        let id = self.pending_id.take();

        if require_id && id.is_none() {
            return Err(QueryError::MissingIdentifier {
                operation: format!("bulk {}", action),
            }
            .into());
        }

        let mut target = Map::new();
        if let Some(index) = index {
            target.insert("_index".to_string(), Value::String(index));
        }
        if let Some(id) = id {
            target.insert("_id".to_string(), Value::String(id));
        }

        let mut metadata = Map::new();
        metadata.insert(action.to_string(), Value::Object(target));
        self.body.push(Value::Object(metadata));
        if let Some(payload) = payload {
            self.body.push(payload);
        }
        self.operation_count += 1;

        if self
            .autocommit_after
            .is_some_and(|threshold| self.operation_count >= threshold)
        {
            self.commit().await?;
        }

        Ok(self)
    }

    /// Number of actions waiting to be committed.
    pub fn operation_count(&self) -> usize {
        self.operation_count
    }

    /// Returns the accumulated body lines.
    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// Returns true if no action is pending.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Sends the accumulated actions as one bulk request and clears them.
    ///
    /// Returns `None` without a request when nothing is pending. A failed
    /// request leaves every action pending so the commit can be retried.
    pub async fn commit(&mut self) -> OdmResult<Option<Value>> {
        if self.body.is_empty() {
            return Ok(None);
        }

        let mut params = Map::new();
        params.insert("body".to_string(), Value::Array(self.body.clone()));
        if !self.ignores.is_empty() {
            let ignores: Vec<u16> = self.ignores.iter().copied().collect();
            params.insert("client".to_string(), json!({ "ignore": ignores }));
        }

        debug!(operations = self.operation_count, "Executing bulk request");
        let response = self.transport.bulk(Value::Object(params)).await?;

        self.body.clear();
        self.operation_count = 0;
        Ok(Some(response))
    }
}
