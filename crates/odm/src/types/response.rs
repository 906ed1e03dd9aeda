//! Search response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OdmResult, TransportError};

/// Shard statistics of a search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShardReport {
    /// Shards queried.
    #[serde(default)]
    pub total: u64,
    /// Shards that answered.
    #[serde(default)]
    pub successful: u64,
    /// Shards skipped by the pre-filter phase.
    #[serde(default)]
    pub skipped: u64,
    /// Shards that failed.
    #[serde(default)]
    pub failed: u64,
}

/// `hits.total`, either a bare count or `{value, relation}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    /// Pre-7.0 style integer total.
    Count(u64),
    /// Tracked total with its accuracy relation (`eq` or `gte`).
    Tracked {
        /// Number of hits.
        value: u64,
        /// `eq` for an exact count, `gte` for a lower bound.
        relation: String,
    },
}

impl TotalHits {
    /// Returns the number of hits.
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(count) => *count,
            TotalHits::Tracked { value, .. } => *value,
        }
    }

    /// Returns the accuracy relation; a bare count is exact.
    pub fn relation(&self) -> &str {
        match self {
            TotalHits::Count(_) => "eq",
            TotalHits::Tracked { relation, .. } => relation,
        }
    }
}

/// The `hits` section of a search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitsSection {
    /// Total matching documents.
    #[serde(default)]
    pub total: Option<TotalHits>,
    /// Highest score among the hits.
    #[serde(default)]
    pub max_score: Option<f64>,
    /// Raw hit objects (`_index`, `_id`, `_score`, `_source`, `fields`, ...).
    #[serde(default)]
    pub hits: Vec<Value>,
}

/// Decoded search or scroll response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchEnvelope {
    /// Scroll cursor for the next page.
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
    /// Server-side duration in milliseconds.
    #[serde(default)]
    pub took: Option<u64>,
    /// Whether the search timed out.
    #[serde(default)]
    pub timed_out: bool,
    /// Shard statistics.
    #[serde(rename = "_shards", default)]
    pub shards: Option<ShardReport>,
    /// The hits.
    #[serde(default)]
    pub hits: HitsSection,
    /// Suggestion results.
    #[serde(default)]
    pub suggest: Option<Value>,
    /// Aggregation results.
    #[serde(default)]
    pub aggregations: Option<Value>,
}

impl SearchEnvelope {
    /// Decodes a raw response. `null` and `{}` decode to an empty envelope.
    pub fn parse(response: Value) -> OdmResult<Self> {
        if response.is_null() {
            return Ok(Self::default());
        }

        serde_json::from_value(response).map_err(|e| {
            TransportError::MalformedResponse {
                operation: "search".to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_hits_shapes() {
        let bare: TotalHits = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(bare.value(), 42);
        assert_eq!(bare.relation(), "eq");

        let tracked: TotalHits =
            serde_json::from_value(json!({"value": 10000, "relation": "gte"})).unwrap();
        assert_eq!(tracked.value(), 10000);
        assert_eq!(tracked.relation(), "gte");
    }

    #[test]
    fn test_parse_null_and_empty() {
        let envelope = SearchEnvelope::parse(Value::Null).unwrap();
        assert!(envelope.hits.hits.is_empty());

        let envelope = SearchEnvelope::parse(json!({})).unwrap();
        assert!(envelope.hits.total.is_none());
    }

    #[test]
    fn test_parse_full_envelope() {
        let envelope = SearchEnvelope::parse(json!({
            "_scroll_id": "abc",
            "took": 3,
            "timed_out": false,
            "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
            "hits": {
                "total": {"value": 1, "relation": "eq"},
                "max_score": 1.5,
                "hits": [{"_id": "1"}]
            }
        }))
        .unwrap();

        assert_eq!(envelope.scroll_id.as_deref(), Some("abc"));
        assert_eq!(envelope.took, Some(3));
        assert_eq!(envelope.shards.map(|s| s.successful), Some(1));
        assert_eq!(envelope.hits.max_score, Some(1.5));
        assert_eq!(envelope.hits.hits.len(), 1);
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        let err = SearchEnvelope::parse(json!({"hits": {"hits": "nope"}})).unwrap_err();
        assert!(err.to_string().contains("malformed search response"));
    }
}
