//! Boolean-query clause fragments.

use std::fmt;

use serde_json::{Map, Value, json};

/// One of the four boolean-query slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseGroup {
    /// Non-scoring, must match.
    Filter,
    /// Scoring, must match.
    Must,
    /// Must not match.
    MustNot,
    /// Should match; see `minimum_should_match`.
    Should,
}

impl ClauseGroup {
    /// All groups in compilation order.
    pub const ALL: [ClauseGroup; 4] = [
        ClauseGroup::Filter,
        ClauseGroup::Must,
        ClauseGroup::MustNot,
        ClauseGroup::Should,
    ];

    /// Returns the DSL key of this group.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseGroup::Filter => "filter",
            ClauseGroup::Must => "must",
            ClauseGroup::MustNot => "must_not",
            ClauseGroup::Should => "should",
        }
    }

    /// Returns the group a negated condition lands in.
    pub fn negated(&self) -> ClauseGroup {
        match self {
            ClauseGroup::Filter | ClauseGroup::Must | ClauseGroup::Should => ClauseGroup::MustNot,
            ClauseGroup::MustNot => ClauseGroup::Filter,
        }
    }
}

impl fmt::Display for ClauseGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DSL query type of a clause.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClauseType {
    Term,
    Terms,
    Range,
    Match,
    Exists,
    Prefix,
    Wildcard,
    Regexp,
    GeoDistance,
    Nested,
    Pinned,
    Ids,
    MatchAll,
    MatchNone,
    /// Any other query type, passed through by name (e.g. `multi_match`).
    Other(String),
}

impl ClauseType {
    /// Returns the DSL key of this query type.
    pub fn as_str(&self) -> &str {
        match self {
            ClauseType::Term => "term",
            ClauseType::Terms => "terms",
            ClauseType::Range => "range",
            ClauseType::Match => "match",
            ClauseType::Exists => "exists",
            ClauseType::Prefix => "prefix",
            ClauseType::Wildcard => "wildcard",
            ClauseType::Regexp => "regexp",
            ClauseType::GeoDistance => "geo_distance",
            ClauseType::Nested => "nested",
            ClauseType::Pinned => "pinned",
            ClauseType::Ids => "ids",
            ClauseType::MatchAll => "match_all",
            ClauseType::MatchNone => "match_none",
            ClauseType::Other(name) => name,
        }
    }
}

impl From<&str> for ClauseType {
    fn from(name: &str) -> Self {
        match name {
            "term" => ClauseType::Term,
            "terms" => ClauseType::Terms,
            "range" => ClauseType::Range,
            "match" => ClauseType::Match,
            "exists" => ClauseType::Exists,
            "prefix" => ClauseType::Prefix,
            "wildcard" => ClauseType::Wildcard,
            "regexp" => ClauseType::Regexp,
            "geo_distance" => ClauseType::GeoDistance,
            "nested" => ClauseType::Nested,
            "pinned" => ClauseType::Pinned,
            "ids" => ClauseType::Ids,
            "match_all" => ClauseType::MatchAll,
            "match_none" => ClauseType::MatchNone,
            other => ClauseType::Other(other.to_string()),
        }
    }
}

impl From<String> for ClauseType {
    fn from(name: String) -> Self {
        ClauseType::from(name.as_str())
    }
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{clauseType, field, parameters}` fragment.
///
/// With a field the clause compiles to `{type: {field: parameters}}`, without
/// one to `{type: parameters}`. `exists` always compiles to
/// `{"exists": {"field": field}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    kind: ClauseType,
    field: Option<String>,
    parameters: Value,
}

impl Clause {
    /// Creates a clause from literal parameters.
    pub fn raw(kind: impl Into<ClauseType>, parameters: Value) -> Self {
        Self {
            kind: kind.into(),
            field: None,
            parameters,
        }
    }

    /// Creates a clause targeting a field.
    pub fn on_field(
        kind: impl Into<ClauseType>,
        field: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            field: Some(field.into()),
            parameters,
        }
    }

    /// `{"term": {field: value}}`
    pub fn term(field: impl Into<String>, value: Value) -> Self {
        Self::on_field(ClauseType::Term, field, value)
    }

    /// `{"terms": {field: [values]}}`
    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::on_field(ClauseType::Terms, field, Value::Array(values))
    }

    /// `{"range": {field: {bounds}}}`
    pub fn range(field: impl Into<String>, bounds: Map<String, Value>) -> Self {
        Self::on_field(ClauseType::Range, field, Value::Object(bounds))
    }

    /// `{"match": {field: value}}`
    pub fn matches(field: impl Into<String>, value: Value) -> Self {
        Self::on_field(ClauseType::Match, field, value)
    }

    /// `{"exists": {"field": field}}`
    pub fn exists(field: impl Into<String>) -> Self {
        Self::on_field(ClauseType::Exists, field, Value::Null)
    }

    /// `{"match_all": {}}`
    pub fn match_all() -> Self {
        Self::raw(ClauseType::MatchAll, Value::Object(Map::new()))
    }

    /// `{"match_none": {}}`
    pub fn match_none() -> Self {
        Self::raw(ClauseType::MatchNone, Value::Object(Map::new()))
    }

    /// Returns the query type.
    pub fn kind(&self) -> &ClauseType {
        &self.kind
    }

    /// Returns the targeted field, if any.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the clause parameters.
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Compiles the clause into its DSL representation.
    pub fn to_value(&self) -> Value {
        let inner = match (&self.kind, &self.field) {
            (ClauseType::Exists, Some(field)) => json!({ "field": field }),
            (_, Some(field)) => {
                let mut map = Map::new();
                map.insert(field.clone(), self.parameters.clone());
                Value::Object(map)
            }
            (_, None) => self.parameters.clone(),
        };

        let mut clause = Map::new();
        clause.insert(self.kind.as_str().to_string(), inner);
        Value::Object(clause)
    }
}
