//! Fluent condition translation.
//!
//! Maps `where`-style conditions onto boolean-query clauses:
//!
//! | Operator | Clause | Group |
//! |----------|--------|-------|
//! | `=` | `term` | `filter` |
//! | `!=` | `term` | `must_not` |
//! | `>`, `>=`, `<`, `<=` | `range` (`gt`/`gte`/`lt`/`lte`) | `filter` |
//! | `like` | `match` | `must` |
//! | `exists` | `exists` | `must` if truthy, `must_not` if falsy |
//!
//! Negation moves `filter`/`must` conditions to `must_not` and vice versa;
//! for `exists` it flips the truthiness instead.

use std::fmt;

use serde_json::{Map, Value};

use super::clause::{Clause, ClauseGroup};

/// A recognised comparison operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `like`
    Like,
    /// `exists`
    Exists,
}

impl Operator {
    /// Every recognised token.
    pub const TOKENS: [&'static str; 8] = ["=", "!=", ">", ">=", "<", "<=", "like", "exists"];

    /// Parses an operator token. Returns `None` for anything else.
    pub fn parse(token: &str) -> Option<Operator> {
        match token {
            "=" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            ">" => Some(Operator::GreaterThan),
            ">=" => Some(Operator::GreaterThanOrEqual),
            "<" => Some(Operator::LessThan),
            "<=" => Some(Operator::LessThanOrEqual),
            "like" => Some(Operator::Like),
            "exists" => Some(Operator::Exists),
            _ => None,
        }
    }

    /// Returns the token spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "like",
            Operator::Exists => "exists",
        }
    }

    fn range_key(&self) -> Option<&'static str> {
        match self {
            Operator::GreaterThan => Some("gt"),
            Operator::GreaterThanOrEqual => Some("gte"),
            Operator::LessThan => Some("lt"),
            Operator::LessThanOrEqual => Some("lte"),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved `field operator value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The target field.
    pub field: String,
    /// The resolved operator.
    pub operator: Operator,
    /// The comparison value.
    pub value: Value,
}

impl Condition {
    /// Resolves the two-argument form `where(field, value)`.
    ///
    /// A string value spelling an operator token is taken as that operator
    /// with a null value, so `where(field, "exists")` means "field exists".
    /// Pass the operator explicitly to compare against such a string.
    pub fn from_value(field: impl Into<String>, value: Value) -> Self {
        let field = field.into();
        if let Some(operator) = value.as_str().and_then(Operator::parse) {
            return Self {
                field,
                operator,
                value: Value::Null,
            };
        }

        Self {
            field,
            operator: Operator::Equal,
            value,
        }
    }

    /// Resolves the three-argument form `where(field, operator, value)`.
    ///
    /// An unrecognised operator token is treated as the value itself and the
    /// operator defaults to `=`; `value` is then discarded.
    pub fn from_operator(field: impl Into<String>, operator: &str, value: Value) -> Self {
        match Operator::parse(operator) {
            Some(operator) => Self {
                field: field.into(),
                operator,
                value,
            },
            None => Self {
                field: field.into(),
                operator: Operator::Equal,
                value: Value::String(operator.to_string()),
            },
        }
    }

    /// Translates the condition into a clause and its target group.
    pub fn translate(&self, negate: bool) -> (ClauseGroup, Clause) {
        match self.operator {
            Operator::Equal => {
                let group = if negate {
                    ClauseGroup::MustNot
                } else {
                    ClauseGroup::Filter
                };
                (group, Clause::term(&self.field, self.value.clone()))
            }
            Operator::NotEqual => {
                let group = if negate {
                    ClauseGroup::Filter
                } else {
                    ClauseGroup::MustNot
                };
                (group, Clause::term(&self.field, self.value.clone()))
            }
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual => {
                let mut bounds = Map::new();
                if let Some(key) = self.operator.range_key() {
                    bounds.insert(key.to_string(), self.value.clone());
                }
                let group = if negate {
                    ClauseGroup::MustNot
                } else {
                    ClauseGroup::Filter
                };
                (group, Clause::range(&self.field, bounds))
            }
            Operator::Like => {
                let group = if negate {
                    ClauseGroup::MustNot
                } else {
                    ClauseGroup::Must
                };
                (group, Clause::matches(&self.field, self.value.clone()))
            }
            Operator::Exists => {
                let exists = is_truthy(&self.value) != negate;
                let group = if exists {
                    ClauseGroup::Must
                } else {
                    ClauseGroup::MustNot
                };
                (group, Clause::exists(&self.field))
            }
        }
    }
}

/// Truthiness of an `exists` operand. A missing (null) operand counts as true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Normalizes `where_between` arguments.
///
/// A two-element array as `first` is destructured into both bounds and
/// `last` is ignored.
pub fn between_bounds(first: Value, last: Option<Value>) -> (Value, Option<Value>) {
    match first {
        Value::Array(mut pair) if pair.len() == 2 => {
            let upper = pair.pop();
            let lower = pair.pop().unwrap_or(Value::Null);
            (lower, upper)
        }
        other => (other, last),
    }
}

/// Builds the `gte`/`lte` bounds of a between condition.
pub fn between_range(first: Value, last: Option<Value>) -> Map<String, Value> {
    let (lower, upper) = between_bounds(first, last);
    let mut bounds = Map::new();
    bounds.insert("gte".to_string(), lower);
    if let Some(upper) = upper {
        bounds.insert("lte".to_string(), upper);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_two_argument_form_defaults_to_equal() {
        let condition = Condition::from_value("foo", json!("bar"));
        assert_eq!(condition.operator, Operator::Equal);
        assert_eq!(
            condition,
            Condition::from_operator("foo", "=", json!("bar"))
        );
    }

    #[test]
    fn test_operator_token_value_is_swallowed() {
        let condition = Condition::from_value("foo", json!("exists"));
        assert_eq!(condition.operator, Operator::Exists);
        assert_eq!(condition.value, Value::Null);
    }

    #[test]
    fn test_unknown_operator_becomes_value() {
        let condition = Condition::from_operator("foo", "bar", json!("ignored"));
        assert_eq!(condition.operator, Operator::Equal);
        assert_eq!(condition.value, json!("bar"));
    }

    #[test]
    fn test_range_operators() {
        let (group, clause) = Condition::from_operator("views", ">=", json!(10)).translate(false);
        assert_eq!(group, ClauseGroup::Filter);
        assert_eq!(clause.to_value(), json!({"range": {"views": {"gte": 10}}}));

        let (group, clause) = Condition::from_operator("views", "<", json!(5)).translate(true);
        assert_eq!(group, ClauseGroup::MustNot);
        assert_eq!(clause.to_value(), json!({"range": {"views": {"lt": 5}}}));
    }

    #[test]
    fn test_like_goes_to_must() {
        let (group, clause) =
            Condition::from_operator("title", "like", json!("rust")).translate(false);
        assert_eq!(group, ClauseGroup::Must);
        assert_eq!(clause.to_value(), json!({"match": {"title": "rust"}}));
    }

    #[test]
    fn test_not_equal() {
        let (group, _) = Condition::from_operator("a", "!=", json!(1)).translate(false);
        assert_eq!(group, ClauseGroup::MustNot);
        let (group, _) = Condition::from_operator("a", "!=", json!(1)).translate(true);
        assert_eq!(group, ClauseGroup::Filter);
    }

    #[test]
    fn test_exists_truthiness_and_negation() {
        let cases = [
            (json!(true), false, ClauseGroup::Must),
            (json!(false), false, ClauseGroup::MustNot),
            (json!(true), true, ClauseGroup::MustNot),
            (json!(false), true, ClauseGroup::Must),
            (Value::Null, false, ClauseGroup::Must),
        ];
        for (value, negate, expected) in cases {
            let (group, clause) =
                Condition::from_operator("foo", "exists", value).translate(negate);
            assert_eq!(group, expected);
            assert_eq!(clause.to_value(), json!({"exists": {"field": "foo"}}));
        }
    }

    #[test]
    fn test_between_pair_destructuring() {
        assert_eq!(
            between_range(json!([500, 1000]), Some(json!(1))),
            between_range(json!(500), Some(json!(1000)))
        );
        assert_eq!(
            Value::Object(between_range(json!(500), Some(json!(1000)))),
            json!({"gte": 500, "lte": 1000})
        );
    }

    #[test]
    fn test_between_without_upper_bound() {
        assert_eq!(
            Value::Object(between_range(json!(3), None)),
            json!({"gte": 3})
        );
    }
}
