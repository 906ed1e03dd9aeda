//! Request body assembly.
//!
//! [`RequestBody`] accumulates the structural fragments of a search request
//! and compiles them into one DSL body. Compilation is a pure function of the
//! accumulated state, so compiling twice yields byte-identical output.
//!
//! # Key order
//!
//! 1. raw body keys, in insertion order
//! 2. `query.bool.{filter, must, must_not, should}` (non-empty groups only),
//!    deep-merged into any raw `query.bool`
//! 3. `_source.{includes, excludes}` once any include/exclude call happened
//! 4. `aggs`, `sort`, `highlight`, `suggest`, `collapse`

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use super::clause::{Clause, ClauseGroup};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// Returns the DSL spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// A single sort entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    /// The field to sort on.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortClause {
    fn to_value(&self) -> Value {
        let mut order = Map::new();
        order.insert(
            "order".to_string(),
            Value::String(self.direction.as_str().to_string()),
        );
        let mut entry = Map::new();
        entry.insert(self.field.clone(), Value::Object(order));
        Value::Object(entry)
    }
}

/// `_source` inclusion/exclusion sets.
///
/// A field lives in at most one of the two sets: adding it to one removes it
/// from the other, so the most recent call wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFilter {
    includes: IndexSet<String>,
    excludes: IndexSet<String>,
}

impl SourceFilter {
    /// Adds fields to the include set.
    pub fn include<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            self.excludes.shift_remove(&field);
            self.includes.insert(field);
        }
    }

    /// Adds fields to the exclude set.
    pub fn exclude<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            self.includes.shift_remove(&field);
            self.excludes.insert(field);
        }
    }

    /// Returns the included fields in insertion order.
    pub fn includes(&self) -> Vec<&str> {
        self.includes.iter().map(String::as_str).collect()
    }

    /// Returns the excluded fields in insertion order.
    pub fn excludes(&self) -> Vec<&str> {
        self.excludes.iter().map(String::as_str).collect()
    }

    fn to_value(&self) -> Value {
        let mut source = Map::new();
        source.insert(
            "includes".to_string(),
            Value::Array(self.includes.iter().cloned().map(Value::String).collect()),
        );
        source.insert(
            "excludes".to_string(),
            Value::Array(self.excludes.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(source)
    }
}

/// Accumulated fragments of a search request body.
#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    raw: Map<String, Value>,
    filter: Vec<Clause>,
    must: Vec<Clause>,
    must_not: Vec<Clause>,
    should: Vec<Clause>,
    minimum_should_match: Option<Value>,
    source: Option<SourceFilter>,
    aggregations: IndexMap<String, Value>,
    sort: Vec<SortClause>,
    highlight: Option<Value>,
    suggest: IndexMap<String, Value>,
    collapse: Option<Value>,
}

impl RequestBody {
    /// Creates an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause to a group.
    pub fn add(&mut self, group: ClauseGroup, clause: Clause) {
        self.group_mut(group).push(clause);
    }

    /// Inserts a clause at the front of a group.
    pub fn prepend(&mut self, group: ClauseGroup, clause: Clause) {
        self.group_mut(group).insert(0, clause);
    }

    /// Returns the clauses of a group.
    pub fn clauses(&self, group: ClauseGroup) -> &[Clause] {
        match group {
            ClauseGroup::Filter => &self.filter,
            ClauseGroup::Must => &self.must,
            ClauseGroup::MustNot => &self.must_not,
            ClauseGroup::Should => &self.should,
        }
    }

    fn group_mut(&mut self, group: ClauseGroup) -> &mut Vec<Clause> {
        match group {
            ClauseGroup::Filter => &mut self.filter,
            ClauseGroup::Must => &mut self.must,
            ClauseGroup::MustNot => &mut self.must_not,
            ClauseGroup::Should => &mut self.should,
        }
    }

    /// Returns true if any boolean clause was added.
    pub fn has_clauses(&self) -> bool {
        ClauseGroup::ALL
            .iter()
            .any(|group| !self.clauses(*group).is_empty())
    }

    /// Merges raw keys into the body. Later calls overwrite earlier keys.
    pub fn merge_raw(&mut self, raw: Map<String, Value>) {
        for (key, value) in raw {
            self.raw.insert(key, value);
        }
    }

    /// Sets a single raw key.
    pub fn set_raw(&mut self, key: impl Into<String>, value: Value) {
        self.raw.insert(key.into(), value);
    }

    /// Returns the raw body overrides.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Sets `minimum_should_match`. Only emitted while `should` is non-empty.
    pub fn set_minimum_should_match(&mut self, value: Value) {
        self.minimum_should_match = Some(value);
    }

    /// Returns the source filter, creating it on first use.
    pub fn source_mut(&mut self) -> &mut SourceFilter {
        self.source.get_or_insert_with(SourceFilter::default)
    }

    /// Returns the source filter if any include/exclude call happened.
    pub fn source(&self) -> Option<&SourceFilter> {
        self.source.as_ref()
    }

    /// Registers (or replaces) a named aggregation.
    pub fn aggregate(&mut self, name: impl Into<String>, spec: Value) {
        self.aggregations.insert(name.into(), spec);
    }

    /// Appends a sort entry.
    pub fn sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.sort.push(SortClause {
            field: field.into(),
            direction,
        });
    }

    /// Returns the sort entries.
    pub fn sort_clauses(&self) -> &[SortClause] {
        &self.sort
    }

    /// Sets the highlight block.
    pub fn set_highlight(&mut self, highlight: Value) {
        self.highlight = Some(highlight);
    }

    /// Registers (or replaces) a named suggestion block.
    pub fn suggest(&mut self, name: impl Into<String>, spec: Value) {
        self.suggest.insert(name.into(), spec);
    }

    /// Sets the collapse block.
    pub fn set_collapse(&mut self, collapse: Value) {
        self.collapse = Some(collapse);
    }

    /// Appends every group to `bool_query`, after any clauses already there.
    fn merge_clauses(&self, bool_query: &mut Map<String, Value>) {
        for group in ClauseGroup::ALL {
            let clauses = self.clauses(group);
            if clauses.is_empty() {
                continue;
            }

            let compiled: Vec<Value> = clauses.iter().map(Clause::to_value).collect();
            match bool_query.get_mut(group.as_str()) {
                Some(Value::Array(existing)) => existing.extend(compiled),
                _ => {
                    bool_query.insert(group.as_str().to_string(), Value::Array(compiled));
                }
            }
        }

        if !self.should.is_empty() {
            if let Some(ref minimum) = self.minimum_should_match {
                bool_query.insert("minimum_should_match".to_string(), minimum.clone());
            }
        }
    }

    /// Compiles the accumulated fragments into a DSL body.
    pub fn compile(&self) -> Value {
        let mut body = self.raw.clone();

        if self.has_clauses() {
            with_object(&mut body, "query", |query| {
                with_object(query, "bool", |bool_query| self.merge_clauses(bool_query));
            });
        }

        if let Some(ref source) = self.source {
            body.insert("_source".to_string(), source.to_value());
        }

        if !self.aggregations.is_empty() {
            let aggs: Map<String, Value> = self
                .aggregations
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect();
            body.insert("aggs".to_string(), Value::Object(aggs));
        }

        if !self.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort.iter().map(SortClause::to_value).collect()),
            );
        }

        if let Some(ref highlight) = self.highlight {
            body.insert("highlight".to_string(), highlight.clone());
        }

        if !self.suggest.is_empty() {
            let suggest: Map<String, Value> = self
                .suggest
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect();
            body.insert("suggest".to_string(), Value::Object(suggest));
        }

        if let Some(ref collapse) = self.collapse {
            body.insert("collapse".to_string(), collapse.clone());
        }

        Value::Object(body)
    }
}

/// Runs `f` on the object stored under `key`, replacing any non-object
/// value. The key keeps its position when it already exists.
fn with_object<F>(map: &mut Map<String, Value>, key: &str, f: F)
where
    F: FnOnce(&mut Map<String, Value>),
{
    let mut object = match map.get_mut(key).map(Value::take) {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    };
    f(&mut object);
    map.insert(key.to_string(), Value::Object(object));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_body() {
        assert_eq!(RequestBody::new().compile(), json!({}));
    }

    #[test]
    fn test_groups_compile_in_order() {
        let mut body = RequestBody::new();
        body.add(ClauseGroup::Should, Clause::term("d", json!(4)));
        body.add(ClauseGroup::MustNot, Clause::term("c", json!(3)));
        body.add(ClauseGroup::Must, Clause::term("b", json!(2)));
        body.add(ClauseGroup::Filter, Clause::term("a", json!(1)));

        let compiled = serde_json::to_string(&body.compile()).unwrap();
        assert_eq!(
            compiled,
            concat!(
                r#"{"query":{"bool":{"filter":[{"term":{"a":1}}],"must":[{"term":{"b":2}}],"#,
                r#""must_not":[{"term":{"c":3}}],"should":[{"term":{"d":4}}]}}}"#
            )
        );
    }

    #[test]
    fn test_raw_body_first_and_deep_merged() {
        let mut body = RequestBody::new();
        body.merge_raw(
            json!({
                "track_total_hits": true,
                "query": {"bool": {"filter": [{"term": {"raw": true}}]}}
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        body.add(ClauseGroup::Filter, Clause::term("a", json!(1)));

        let compiled = body.compile();
        assert_eq!(
            compiled["query"]["bool"]["filter"],
            json!([{"term": {"raw": true}}, {"term": {"a": 1}}])
        );
        let keys: Vec<&String> = compiled.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["track_total_hits", "query"]);
    }

    #[test]
    fn test_non_object_raw_query_is_replaced_in_place() {
        let mut body = RequestBody::new();
        body.set_raw("query", json!("match everything"));
        body.set_raw("size", json!(5));
        body.add(ClauseGroup::Must, Clause::term("a", json!(1)));

        let compiled = body.compile();
        assert_eq!(compiled["query"], json!({"bool": {"must": [{"term": {"a": 1}}]}}));
        let keys: Vec<&String> = compiled.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["query", "size"]);
    }

    #[test]
    fn test_source_absent_until_touched() {
        let mut body = RequestBody::new();
        assert!(body.compile().get("_source").is_none());

        body.source_mut().include(Vec::<String>::new());
        assert_eq!(
            body.compile()["_source"],
            json!({"includes": [], "excludes": []})
        );
    }

    #[test]
    fn test_minimum_should_match_requires_should() {
        let mut body = RequestBody::new();
        body.add(ClauseGroup::Must, Clause::raw("match", json!({"foo": "bar"})));
        body.set_minimum_should_match(json!(42));
        let compiled = body.compile();
        assert!(compiled["query"]["bool"].get("minimum_should_match").is_none());

        body.add(ClauseGroup::Should, Clause::term("x", json!(1)));
        assert_eq!(compiled_msm(&body), Some(json!(42)));
    }

    fn compiled_msm(body: &RequestBody) -> Option<Value> {
        body.compile()["query"]["bool"]
            .get("minimum_should_match")
            .cloned()
    }

    #[test]
    fn test_trailing_sections_order() {
        let mut body = RequestBody::new();
        body.set_collapse(json!({"field": "user"}));
        body.suggest("s", json!({"text": "x"}));
        body.set_highlight(json!({"fields": {"title": {}}}));
        body.sort("date", SortDirection::Descending);
        body.aggregate("by_tag", json!({"terms": {"field": "tag"}}));
        body.source_mut().exclude(["secret"]);

        let compiled = body.compile();
        let keys: Vec<&String> = compiled.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec!["_source", "aggs", "sort", "highlight", "suggest", "collapse"]
        );
        assert_eq!(compiled["sort"], json!([{"date": {"order": "desc"}}]));
    }
}
