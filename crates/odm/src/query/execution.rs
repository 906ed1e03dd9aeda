//! Terminal operations of the builder.
//!
//! Reads go through [`Builder::get`] and friends, which consult the cache
//! collaborator when a TTL is set and follow scroll cursors. Writes compile a
//! minimal `{index, id, body, client}` parameter map and hand it to the
//! transport. Every call awaits the transport before returning.

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::builder::Builder;
use super::bulk::Bulk;
use super::condition::Condition;
use crate::core::CacheLookup;
use crate::error::{ModelError, OdmResult, QueryError, TransportError};
use crate::model::Model;
use crate::types::{Collection, Pagination};

impl Builder {
    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Runs the query and hydrates the hits.
    ///
    /// With a scroll window set, continues the stored scroll cursor if there
    /// is one; the cursor returned by the cluster is kept for the next call.
    pub async fn get(&mut self) -> OdmResult<Collection> {
        let response = self.get_result().await?;
        Collection::from_response(self.definition(), response)
    }

    /// Continues the scroll cursor `scroll_id`.
    pub async fn get_with_scroll_id(
        &mut self,
        scroll_id: impl Into<String>,
    ) -> OdmResult<Collection> {
        self.scroll_id = Some(scroll_id.into());
        self.get().await
    }

    /// Returns the first hit. Forces a page size of one.
    pub async fn first(&mut self) -> OdmResult<Option<Model>> {
        self.take = 1;
        Ok(self.get().await?.into_iter().next())
    }

    /// Like [`Builder::first`], but a missing hit is an error carrying the
    /// model type and the attempted id and filters.
    pub async fn first_or_fail(&mut self) -> OdmResult<Model> {
        match self.first().await? {
            Some(model) => Ok(model),
            None => Err(ModelError::NotFound {
                model_type: self.model.model_type().to_string(),
                ids: self.id.iter().cloned().collect(),
                filters: self.describe_filters(),
            }
            .into()),
        }
    }

    /// Looks up a document by id.
    pub async fn find(&mut self, id: impl Into<String>) -> OdmResult<Option<Model>> {
        self.id = Some(id.into());
        self.first().await
    }

    /// Looks up a document by id, failing when it does not exist.
    pub async fn find_or_fail(&mut self, id: impl Into<String>) -> OdmResult<Model> {
        self.id = Some(id.into());
        self.first_or_fail().await
    }

    /// Adds an equality condition and returns the first hit.
    pub async fn first_where(
        &mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> OdmResult<Option<Model>> {
        let (group, clause) = Condition::from_value(field, value.into()).translate(false);
        self.body.add(group, clause);
        self.first().await
    }

    /// Counts matching documents.
    ///
    /// `from`, `size`, `_source` and `sort` are stripped since the count
    /// endpoint rejects them.
    pub async fn count(&self) -> OdmResult<u64> {
        let mut params = self.to_params();
        if let Value::Object(ref mut map) = params {
            map.remove("from");
            map.remove("size");
            map.remove("scroll");
            map.remove("search_type");
            if let Some(Value::Object(body)) = map.get_mut("body") {
                body.remove("_source");
                body.remove("sort");
            }
        }

        debug!(index = ?self.index, "Executing count request");
        let response = self.connection().transport().count(params).await?;
        response.get("count").and_then(Value::as_u64).ok_or_else(|| {
            TransportError::MalformedResponse {
                operation: "count".to_string(),
                message: "response has no integer `count` field".to_string(),
            }
            .into()
        })
    }

    /// Runs one page of the query.
    ///
    /// The page is `page` if given, else the one reported by the connection's
    /// page resolver for `page_param`, else `1`.
    pub async fn paginate(
        &mut self,
        per_page: u64,
        page_param: &str,
        page: Option<u64>,
    ) -> OdmResult<Pagination> {
        if per_page == 0 {
            return Err(QueryError::InvalidArgument {
                message: "per_page must be greater than zero".to_string(),
            }
            .into());
        }

        let page = page
            .or_else(|| {
                self.connection()
                    .page_resolver()
                    .and_then(|resolver| resolver.current_page(page_param))
            })
            .unwrap_or(1)
            .max(1);

        let skip = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| QueryError::InvalidArgument {
                message: format!("page {} with {} per page is out of range", page, per_page),
            })?;

        self.take = per_page;
        self.skip = skip;

        let items = self.get().await?;
        Ok(Pagination::new(items, per_page, page, page_param))
    }

    /// Runs the query without caching and returns the raw response.
    pub async fn raw(&self) -> OdmResult<Value> {
        debug!(index = ?self.index, "Executing raw search request");
        self.connection().transport().search(self.to_params()).await
    }

    /// Releases a scroll cursor, the stored one if `scroll_id` is `None`.
    pub async fn clear_scroll(&mut self, scroll_id: Option<&str>) -> OdmResult<Value> {
        let scroll_id = match scroll_id.map(str::to_string).or_else(|| self.scroll_id.clone()) {
            Some(id) => id,
            None => {
                return Err(QueryError::InvalidArgument {
                    message: "no scroll id to clear".to_string(),
                }
                .into());
            }
        };

        let mut params = Map::new();
        params.insert("scroll_id".to_string(), Value::String(scroll_id.clone()));
        self.merge_client_options(&mut params);

        debug!(scroll_id = %scroll_id, "Clearing scroll cursor");
        let response = self
            .connection()
            .transport()
            .clear_scroll(Value::Object(params))
            .await?;

        if self.scroll_id.as_deref() == Some(scroll_id.as_str()) {
            self.scroll_id = None;
        }
        Ok(response)
    }

    /// Resolves the raw response, from the cache when possible.
    ///
    /// Cache failures and corrupted entries fall back to a live search.
    /// Scrolled queries always search live since every call advances the
    /// cursor.
    async fn get_result(&mut self) -> OdmResult<Value> {
        let Some(ttl) = self.cache_ttl else {
            return self.execute_search().await;
        };
        if self.scroll.is_some() {
            debug!("Bypassing cache for scrolled query");
            return self.execute_search().await;
        }
        let Some(cache) = self.connection().cache().cloned() else {
            return self.execute_search().await;
        };

        let key = self.cache_key();
        match cache.get(&key).await {
            Ok(CacheLookup::Hit(value)) if value.is_object() => {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
            Ok(CacheLookup::Hit(_)) => warn!(key = %key, "Ignoring corrupted cache entry"),
            Ok(CacheLookup::Miss) => debug!(key = %key, "Cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache lookup failed, searching live"),
        }

        let response = self.execute_search().await?;
        if let Err(e) = cache.set(&key, response.clone(), ttl).await {
            warn!(key = %key, error = %e, "Failed to store search response in cache");
        }
        Ok(response)
    }

    async fn execute_search(&mut self) -> OdmResult<Value> {
        let transport = self.connection().transport().clone();

        let response = match (&self.scroll, &self.scroll_id) {
            (Some(scroll), Some(scroll_id)) => {
                debug!(scroll = %scroll, "Continuing scroll cursor");
                let mut params = Map::new();
                params.insert("scroll".to_string(), Value::String(scroll.clone()));
                params.insert("scroll_id".to_string(), Value::String(scroll_id.clone()));
                self.merge_client_options(&mut params);
                transport.scroll(Value::Object(params)).await?
            }
            _ => {
                debug!(
                    index = ?self.index,
                    from = self.skip,
                    size = self.take,
                    "Executing search request"
                );
                transport.search(self.to_params()).await?
            }
        };

        if self.scroll.is_some() {
            if let Some(scroll_id) = response.get("_scroll_id").and_then(Value::as_str) {
                self.scroll_id = Some(scroll_id.to_string());
            }
        }

        Ok(response)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    fn write_params(
        &self,
        operation: &str,
        id: Option<&str>,
        require_id: bool,
    ) -> OdmResult<Map<String, Value>> {
        let index = self.index.clone().ok_or_else(|| QueryError::MissingIndex {
            operation: operation.to_string(),
        })?;

        let mut params = Map::new();
        params.insert("index".to_string(), Value::String(index));

        match id.or(self.id.as_deref()) {
            Some(id) => {
                params.insert("id".to_string(), Value::String(id.to_string()));
            }
            None if require_id => {
                return Err(QueryError::MissingIdentifier {
                    operation: operation.to_string(),
                }
                .into());
            }
            None => {}
        }

        self.merge_client_options(&mut params);
        Ok(params)
    }

    /// Indexes a document, under `id` or the builder's id when given.
    pub async fn insert(&self, document: Value, id: Option<&str>) -> OdmResult<Value> {
        let mut params = self.write_params("insert", id, false)?;
        params.insert("body".to_string(), document);

        debug!(index = ?self.index, "Executing index request");
        self.connection()
            .transport()
            .index(Value::Object(params))
            .await
    }

    /// Partially updates the targeted document with `fields`.
    pub async fn update(&self, fields: Value) -> OdmResult<Value> {
        let mut params = self.write_params("update", None, true)?;
        params.insert("body".to_string(), json!({ "doc": fields }));

        debug!(index = ?self.index, id = ?self.id, "Executing update request");
        self.connection()
            .transport()
            .update(Value::Object(params))
            .await
    }

    /// Deletes the targeted document.
    pub async fn delete(&self) -> OdmResult<Value> {
        let params = self.write_params("delete", None, true)?;

        debug!(index = ?self.index, id = ?self.id, "Executing delete request");
        self.connection()
            .transport()
            .delete(Value::Object(params))
            .await
    }

    /// Runs a painless script against the targeted document.
    pub async fn script(&self, source: impl Into<String>, params: Value) -> OdmResult<Value> {
        let source: String = source.into();
        let mut request = self.write_params("script", None, true)?;
        request.insert(
            "body".to_string(),
            json!({ "script": { "source": source, "params": params } }),
        );

        debug!(index = ?self.index, id = ?self.id, "Executing scripted update request");
        self.connection()
            .transport()
            .update(Value::Object(request))
            .await
    }

    /// Adds `count` to a numeric field of the targeted document.
    pub async fn increment(&self, field: &str, count: i64) -> OdmResult<Value> {
        self.script(
            format!("ctx._source.{} += params.count", field),
            json!({ "count": count }),
        )
        .await
    }

    /// Subtracts `count` from a numeric field of the targeted document.
    pub async fn decrement(&self, field: &str, count: i64) -> OdmResult<Value> {
        self.script(
            format!("ctx._source.{} -= params.count", field),
            json!({ "count": count }),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Bulk
    // ------------------------------------------------------------------

    /// Returns a bulk builder targeting the builder's index.
    pub fn new_bulk(&self) -> Bulk {
        Bulk::new(self.connection().transport().clone(), self.index.clone())
            .ignore(self.ignores.iter().copied())
    }

    /// Indexes every `id -> document` entry in one bulk request.
    pub async fn bulk_documents(&self, documents: Map<String, Value>) -> OdmResult<Option<Value>> {
        let mut bulk = self.new_bulk();
        for (id, document) in documents {
            bulk.id(id).insert(document).await?;
        }
        bulk.commit().await
    }

    /// Sequences bulk actions through `actions` and commits them.
    pub async fn bulk_with<F>(&self, actions: F) -> OdmResult<Option<Value>>
    where
        F: AsyncFnOnce(&mut Bulk) -> OdmResult<()>,
    {
        let mut bulk = self.new_bulk();
        actions(&mut bulk).await?;
        bulk.commit().await
    }
}
