//! Fluent query builder.
//!
//! A [`Builder`] accumulates conditions and request options by value: every
//! fluent method consumes the builder and returns it, so a chain ends in an
//! owned handle that can be cloned freely. Compiling (`to_body`,
//! `to_params`) never mutates the accumulated state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use md5::{Digest, Md5};
use serde_json::{Map, Value, json};
use tracing::warn;

use super::body::{RequestBody, SortDirection};
use super::clause::{Clause, ClauseGroup, ClauseType};
use super::condition::{Condition, between_range};
use super::regexp::RegexpOptions;
use crate::connection::Connection;
use crate::core::CacheTtl;
use crate::error::{OdmResult, ScopeError};
use crate::model::{Model, ModelDefinition};

/// A sub-query for `nested` and `pinned` clauses.
#[derive(Debug, Clone)]
pub enum SubQuery {
    /// A literal DSL query fragment.
    Dsl(Value),
    /// Another builder whose compiled `query` is inlined.
    Builder(Box<Builder>),
}

impl SubQuery {
    /// Returns the DSL query fragment.
    ///
    /// A builder without any query clauses inlines `match_all`.
    pub fn to_query(&self) -> Value {
        match self {
            SubQuery::Dsl(query) => query.clone(),
            SubQuery::Builder(builder) => builder
                .to_body()
                .get("query")
                .cloned()
                .unwrap_or_else(|| Clause::match_all().to_value()),
        }
    }
}

impl From<Value> for SubQuery {
    fn from(query: Value) -> Self {
        SubQuery::Dsl(query)
    }
}

impl From<Builder> for SubQuery {
    fn from(builder: Builder) -> Self {
        SubQuery::Builder(Box::new(builder))
    }
}

/// Fluent search request builder bound to a model definition.
#[derive(Clone)]
pub struct Builder {
    pub(crate) model: Model,
    pub(crate) index: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) skip: u64,
    pub(crate) take: u64,
    pub(crate) body: RequestBody,
    pub(crate) ignores: BTreeSet<u16>,
    pub(crate) client_options: Map<String, Value>,
    pub(crate) scroll: Option<String>,
    pub(crate) scroll_id: Option<String>,
    pub(crate) search_type: Option<String>,
    pub(crate) cache_ttl: Option<CacheTtl>,
    pub(crate) cache_key: Option<String>,
    pub(crate) cache_prefix: String,
    removed_scopes: IndexSet<String>,
    scopes_applied: bool,
}

impl Builder {
    /// Creates an unscoped builder for `model`'s definition.
    ///
    /// The target index, page size and cache prefix default to the
    /// definition and connection configuration.
    pub fn new(model: Model) -> Self {
        let definition = model.definition().clone();
        let config = definition.connection().config();

        Self {
            index: definition
                .index()
                .map(str::to_string)
                .or_else(|| config.default_index.clone()),
            id: None,
            skip: 0,
            take: config.default_page_size,
            body: RequestBody::new(),
            ignores: BTreeSet::new(),
            client_options: Map::new(),
            scroll: None,
            scroll_id: None,
            search_type: None,
            cache_ttl: None,
            cache_key: None,
            cache_prefix: config.cache_prefix.clone(),
            removed_scopes: IndexSet::new(),
            scopes_applied: false,
            model,
        }
    }

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------

    /// `where(field, value)`: an equality filter.
    ///
    /// A string value that spells an operator token (e.g. `"exists"`) is
    /// taken as that operator; use [`Builder::where_op`] to compare against
    /// such a literal.
    pub fn where_value(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_condition(Condition::from_value(field, value.into()), false)
    }

    /// `where(field, operator, value)`.
    pub fn where_op(
        self,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.push_condition(Condition::from_operator(field, operator, value.into()), false)
    }

    /// Negated form of [`Builder::where_value`].
    pub fn where_not_value(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_condition(Condition::from_value(field, value.into()), true)
    }

    /// Negated form of [`Builder::where_op`].
    pub fn where_not_op(
        self,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.push_condition(Condition::from_operator(field, operator, value.into()), true)
    }

    fn push_condition(mut self, condition: Condition, negate: bool) -> Self {
        let (group, clause) = condition.translate(negate);
        self.body.add(group, clause);
        self
    }

    /// A `terms` filter over the full value list.
    pub fn where_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.body.add(ClauseGroup::Filter, Clause::terms(field, values));
        self
    }

    /// A negated `terms` clause over the full value list.
    pub fn where_not_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.body.add(ClauseGroup::MustNot, Clause::terms(field, values));
        self
    }

    /// An inclusive `range` filter.
    ///
    /// `first` may be a two-element array holding both bounds, in which case
    /// `last` is ignored. Without an upper bound only `gte` is emitted.
    pub fn where_between(
        mut self,
        field: impl Into<String>,
        first: impl Into<Value>,
        last: Option<Value>,
    ) -> Self {
        let bounds = between_range(first.into(), last);
        self.body.add(ClauseGroup::Filter, Clause::range(field, bounds));
        self
    }

    /// Negated form of [`Builder::where_between`].
    pub fn where_not_between(
        mut self,
        field: impl Into<String>,
        first: impl Into<Value>,
        last: Option<Value>,
    ) -> Self {
        let bounds = between_range(first.into(), last);
        self.body.add(ClauseGroup::MustNot, Clause::range(field, bounds));
        self
    }

    /// A plain `term` filter.
    pub fn where_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body
            .add(ClauseGroup::Filter, Clause::term(field, value.into()));
        self
    }

    /// A `term` filter with a boost. The boost is always emitted as a float.
    pub fn where_term_boosted(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
        boost: impl Into<f64>,
    ) -> Self {
        let value: Value = value.into();
        let boost: f64 = boost.into();
        let params = json!({ "value": value, "boost": boost });
        self.body.add(
            ClauseGroup::Filter,
            Clause::on_field(ClauseType::Term, field, params),
        );
        self
    }

    /// A `range` filter from a bounds object such as `{"gte": 1, "lt": 9}`.
    pub fn where_range(mut self, field: impl Into<String>, bounds: Value) -> Self {
        self.body.add(
            ClauseGroup::Filter,
            Clause::on_field(ClauseType::Range, field, bounds),
        );
        self
    }

    /// A `range` filter with a boost. The boost is always emitted as a float.
    pub fn where_range_boosted(
        mut self,
        field: impl Into<String>,
        bounds: Value,
        boost: impl Into<f64>,
    ) -> Self {
        let mut params = match bounds {
            Value::Object(map) => map,
            other => {
                warn!(bounds = %other, "Ignoring non-object range bounds");
                Map::new()
            }
        };
        let boost: f64 = boost.into();
        params.insert("boost".to_string(), json!(boost));
        self.body
            .add(ClauseGroup::Filter, Clause::range(field, params));
        self
    }

    /// A `prefix` filter.
    pub fn where_prefix(mut self, field: impl Into<String>, prefix: impl Into<Value>) -> Self {
        self.body.add(
            ClauseGroup::Filter,
            Clause::on_field(ClauseType::Prefix, field, prefix.into()),
        );
        self
    }

    /// A `wildcard` filter.
    pub fn where_wildcard(mut self, field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.body.add(
            ClauseGroup::Filter,
            Clause::on_field(ClauseType::Wildcard, field, pattern.into()),
        );
        self
    }

    /// A `regexp` filter.
    pub fn where_regexp(
        mut self,
        field: impl Into<String>,
        pattern: &str,
        options: impl Into<RegexpOptions>,
    ) -> Self {
        let params = options.into().parameters(pattern);
        self.body.add(
            ClauseGroup::Filter,
            Clause::on_field(ClauseType::Regexp, field, params),
        );
        self
    }

    /// A `geo_distance` filter around a point, e.g. `distance("location", 40.7, -74.0, "10km")`.
    pub fn distance(
        mut self,
        field: impl Into<String>,
        lat: f64,
        lon: f64,
        distance: impl Into<String>,
    ) -> Self {
        let mut params = Map::new();
        params.insert("distance".to_string(), Value::String(distance.into()));
        params.insert(field.into(), json!({ "lat": lat, "lon": lon }));
        self.body.add(
            ClauseGroup::Filter,
            Clause::raw(ClauseType::GeoDistance, Value::Object(params)),
        );
        self
    }

    /// A `nested` filter on `path`.
    pub fn nested(mut self, path: impl Into<String>, query: impl Into<SubQuery>) -> Self {
        let path: String = path.into();
        let query: SubQuery = query.into();
        let params = json!({
            "path": path,
            "query": query.to_query(),
        });
        self.body
            .add(ClauseGroup::Filter, Clause::raw(ClauseType::Nested, params));
        self
    }

    /// A `pinned` query promoting `ids` above the `organic` results.
    pub fn pinned<I, S>(mut self, ids: I, organic: impl Into<SubQuery>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<Value> = ids.into_iter().map(|id| Value::String(id.into())).collect();
        let organic: SubQuery = organic.into();
        let params = json!({
            "ids": ids,
            "organic": organic.to_query(),
        });
        self.body
            .add(ClauseGroup::Must, Clause::raw(ClauseType::Pinned, params));
        self
    }

    /// Matches every document (`match_all`).
    pub fn all(mut self) -> Self {
        self.body.add(ClauseGroup::Must, Clause::match_all());
        self
    }

    /// Matches no document (`match_none`).
    pub fn none(mut self) -> Self {
        self.body.add(ClauseGroup::Must, Clause::match_none());
        self
    }

    /// Appends a literal `filter` clause, e.g. `filter("term", json!({"a": 1}))`.
    pub fn filter(self, kind: impl Into<ClauseType>, params: Value) -> Self {
        self.push_raw(ClauseGroup::Filter, kind, params)
    }

    /// Appends a literal `must` clause.
    pub fn must(self, kind: impl Into<ClauseType>, params: Value) -> Self {
        self.push_raw(ClauseGroup::Must, kind, params)
    }

    /// Appends a literal `must_not` clause.
    pub fn must_not(self, kind: impl Into<ClauseType>, params: Value) -> Self {
        self.push_raw(ClauseGroup::MustNot, kind, params)
    }

    /// Appends a literal `should` clause.
    pub fn should(self, kind: impl Into<ClauseType>, params: Value) -> Self {
        self.push_raw(ClauseGroup::Should, kind, params)
    }

    fn push_raw(mut self, group: ClauseGroup, kind: impl Into<ClauseType>, params: Value) -> Self {
        self.body.add(group, Clause::raw(kind, params));
        self
    }

    /// Sets `minimum_should_match`. Dropped unless a `should` clause exists.
    pub fn minimum_should_match(mut self, value: impl Into<Value>) -> Self {
        self.body.set_minimum_should_match(value.into());
        self
    }

    /// Merges raw keys into the request body.
    ///
    /// Accumulated clauses are deep-merged under `query.bool` on top of any
    /// raw `query`.
    pub fn body(mut self, raw: Value) -> Self {
        match raw {
            Value::Object(map) => self.body.merge_raw(map),
            other => warn!(body = %other, "Ignoring non-object raw body"),
        }
        self
    }

    // ------------------------------------------------------------------
    // Output shaping
    // ------------------------------------------------------------------

    /// Adds fields to `_source.includes`.
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.source_mut().include(fields);
        self
    }

    /// Alias of [`Builder::include`].
    pub fn select<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include(fields)
    }

    /// Adds fields to `_source.excludes`.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.source_mut().exclude(fields);
        self
    }

    /// Registers a named aggregation.
    pub fn aggregate(mut self, name: impl Into<String>, spec: Value) -> Self {
        self.body.aggregate(name, spec);
        self
    }

    /// Sorts ascending on `field`.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.body.sort(field, SortDirection::Ascending);
        self
    }

    /// Sorts descending on `field`.
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.body.sort(field, SortDirection::Descending);
        self
    }

    /// Highlights matches in `fields` with default settings.
    pub fn highlight<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Map<String, Value> = fields
            .into_iter()
            .map(|field| (field.into(), Value::Object(Map::new())))
            .collect();
        self.body.set_highlight(json!({ "fields": fields }));
        self
    }

    /// Sets a literal highlight block.
    pub fn highlight_with(mut self, highlight: Value) -> Self {
        self.body.set_highlight(highlight);
        self
    }

    /// Registers a named suggestion block.
    pub fn suggest(mut self, name: impl Into<String>, spec: Value) -> Self {
        self.body.suggest(name, spec);
        self
    }

    /// Collapses results on `field`.
    pub fn collapse(mut self, field: impl Into<String>) -> Self {
        let field: String = field.into();
        self.body.set_collapse(json!({ "field": field }));
        self
    }

    // ------------------------------------------------------------------
    // Target and request options
    // ------------------------------------------------------------------

    /// Sets the target index.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Targets a single document.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the page size.
    pub fn take(mut self, take: u64) -> Self {
        self.take = take;
        self
    }

    /// Alias of [`Builder::take`].
    pub fn limit(self, limit: u64) -> Self {
        self.take(limit)
    }

    /// Sets the number of hits to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Alias of [`Builder::skip`].
    pub fn offset(self, offset: u64) -> Self {
        self.skip(offset)
    }

    /// Treats the given HTTP status codes as non-fatal.
    pub fn ignore<I: IntoIterator<Item = u16>>(mut self, codes: I) -> Self {
        self.ignores.extend(codes);
        self
    }

    /// Sets a client option passed under `client` with every request.
    pub fn client_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.client_options.insert(key.into(), value.into());
        self
    }

    /// Keeps a scroll cursor open for `window` (e.g. `"1m"`).
    pub fn scroll(mut self, window: impl Into<String>) -> Self {
        self.scroll = Some(window.into());
        self
    }

    /// Continues the scroll cursor `scroll_id` on the next `get`.
    pub fn scroll_id(mut self, scroll_id: impl Into<String>) -> Self {
        self.scroll_id = Some(scroll_id.into());
        self
    }

    /// Sets the search type (e.g. `dfs_query_then_fetch`).
    pub fn search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    // ------------------------------------------------------------------
    // Caching
    // ------------------------------------------------------------------

    /// Caches the raw response for `ttl`, optionally under an explicit key.
    pub fn remember(mut self, ttl: impl Into<CacheTtl>, key: Option<&str>) -> Self {
        self.cache_ttl = Some(ttl.into());
        self.cache_key = key.map(str::to_string);
        self
    }

    /// Caches the raw response without expiry.
    pub fn remember_forever(self, key: Option<&str>) -> Self {
        self.remember(CacheTtl::Forever, key)
    }

    /// Sets the prefix of generated cache keys.
    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Returns the cache key for the current state: `{prefix}.{key}`, where
    /// `key` is the explicit key or the md5 digest of the compiled parameters.
    pub fn cache_key(&self) -> String {
        let key = match self.cache_key {
            Some(ref key) => key.clone(),
            None => {
                let params = self.to_params();
                let serialized = match serde_json::to_string(&params) {
                    Ok(serialized) => serialized,
                    Err(e) => {
                        warn!(error = %e, "Falling back to debug representation for cache key");
                        format!("{:?}", params)
                    }
                };
                let mut hasher = Md5::new();
                hasher.update(serialized.as_bytes());
                format!("{:x}", hasher.finalize())
            }
        };

        format!("{}.{}", self.cache_prefix, key)
    }

    /// Returns the configured cache TTL.
    pub fn get_cache_ttl(&self) -> Option<CacheTtl> {
        self.cache_ttl
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Excludes a global scope from application.
    ///
    /// Removal only affects scopes not yet applied; call it before the
    /// scope-application step.
    pub fn without_global_scope(mut self, identifier: impl Into<String>) -> Self {
        self.removed_scopes.insert(identifier.into());
        self
    }

    /// Excludes several global scopes from application.
    pub fn without_global_scopes<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.removed_scopes
            .extend(identifiers.into_iter().map(Into::into));
        self
    }

    /// Excludes every global scope currently registered for the model.
    ///
    /// The identifiers are captured now; scopes registered later still apply.
    pub fn without_all_global_scopes(self) -> Self {
        let definition = self.model.definition().clone();
        let identifiers = definition.scopes().identifiers(definition.model_type());
        self.without_global_scopes(identifiers)
    }

    /// Returns the identifiers of removed global scopes, in removal order.
    pub fn removed_scopes(&self) -> Vec<&str> {
        self.removed_scopes.iter().map(String::as_str).collect()
    }

    /// Returns true once global scopes have been applied.
    pub fn scopes_applied(&self) -> bool {
        self.scopes_applied
    }

    /// Applies the model's global scopes in registration order, skipping
    /// removed identifiers. Applying twice is a no-op.
    pub fn apply_global_scopes(mut self) -> Self {
        if self.scopes_applied {
            return self;
        }
        self.scopes_applied = true;

        let model = self.model.clone();
        let definition = model.definition();
        let scopes = definition.scopes().snapshot(definition.model_type());

        let mut builder = self;
        for (identifier, scope) in scopes {
            if builder.removed_scopes.contains(&identifier) {
                continue;
            }
            builder = scope.apply(builder, &model);
        }
        builder
    }

    /// Applies a named scope of the model definition.
    pub fn scope(self, name: &str, args: &[Value]) -> OdmResult<Self> {
        let definition = self.model.definition().clone();
        match definition.named_scope(name) {
            Some(scope) => Ok(scope(self, args)),
            None => Err(ScopeError::UnknownScope {
                model_type: definition.model_type().to_string(),
                name: name.to_string(),
            }
            .into()),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the model prototype the builder hydrates into.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the model definition.
    pub fn definition(&self) -> &Arc<ModelDefinition> {
        self.model.definition()
    }

    /// Returns the connection.
    pub fn connection(&self) -> &Arc<Connection> {
        self.model.definition().connection()
    }

    /// Returns the target index.
    pub fn get_index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Returns the targeted document id.
    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the number of skipped hits.
    pub fn get_skip(&self) -> u64 {
        self.skip
    }

    /// Returns the page size.
    pub fn get_take(&self) -> u64 {
        self.take
    }

    /// Returns the current scroll id.
    pub fn get_scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Returns the ignored HTTP status codes in ascending order.
    pub fn get_ignores(&self) -> Vec<u16> {
        self.ignores.iter().copied().collect()
    }

    /// Returns the accumulated body fragments.
    pub fn request_body(&self) -> &RequestBody {
        &self.body
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    /// Compiles the request body.
    ///
    /// A targeted id becomes the first `filter` clause.
    pub fn to_body(&self) -> Value {
        match self.id {
            Some(ref id) => {
                let mut body = self.body.clone();
                body.prepend(
                    ClauseGroup::Filter,
                    Clause::term("_id", Value::String(id.clone())),
                );
                body.compile()
            }
            None => self.body.compile(),
        }
    }

    /// Compiles the full search parameter map.
    pub fn to_params(&self) -> Value {
        let mut params = Map::new();
        if let Some(ref index) = self.index {
            params.insert("index".to_string(), Value::String(index.clone()));
        }
        params.insert("body".to_string(), self.to_body());
        params.insert("from".to_string(), json!(self.skip));
        params.insert("size".to_string(), json!(self.take));
        if let Some(ref scroll) = self.scroll {
            params.insert("scroll".to_string(), Value::String(scroll.clone()));
        }
        if let Some(ref search_type) = self.search_type {
            params.insert("search_type".to_string(), Value::String(search_type.clone()));
        }
        self.merge_client_options(&mut params);
        Value::Object(params)
    }

    /// Adds the `client` options (with `ignore`) to a parameter map, keeping
    /// any `client` keys already present.
    pub(crate) fn merge_client_options(&self, params: &mut Map<String, Value>) {
        if self.client_options.is_empty() && self.ignores.is_empty() {
            return;
        }

        let client = params
            .entry("client".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(client) = client {
            for (key, value) in &self.client_options {
                client.insert(key.clone(), value.clone());
            }
            if !self.ignores.is_empty() {
                client.insert("ignore".to_string(), json!(self.get_ignores()));
            }
        }
    }

    /// Describes the `filter` clauses, for not-found diagnostics.
    pub(crate) fn describe_filters(&self) -> Vec<String> {
        self.body
            .clauses(ClauseGroup::Filter)
            .iter()
            .map(|clause| clause.to_value().to_string())
            .collect()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("model_type", &self.model.model_type())
            .field("index", &self.index)
            .field("id", &self.id)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("body", &self.to_body())
            .field("scroll", &self.scroll)
            .field("removed_scopes", &self.removed_scopes)
            .finish()
    }
}
