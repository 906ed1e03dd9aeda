//! Search response fixtures.

use serde_json::{Value, json};

/// A search hit with `_id`, `_index` and `_source`.
pub fn hit(id: &str, source: Value) -> Value {
    json!({
        "_index": "posts",
        "_id": id,
        "_score": 1.0,
        "_source": source
    })
}

/// A search response with a tracked total and the given hits.
pub fn search_response(total: u64, hits: Vec<Value>) -> Value {
    json!({
        "took": 3,
        "timed_out": false,
        "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
        "hits": {
            "total": {"value": total, "relation": "eq"},
            "max_score": 1.0,
            "hits": hits
        }
    })
}

/// A search response carrying a scroll cursor.
pub fn scroll_response(scroll_id: &str, hits: Vec<Value>) -> Value {
    let mut response = search_response(hits.len() as u64, hits);
    response["_scroll_id"] = json!(scroll_id);
    response
}

/// `count` published posts titled `Post {n}`, ids starting at `first_id`.
pub fn post_hits(first_id: u64, count: u64) -> Vec<Value> {
    (first_id..first_id + count)
        .map(|n| {
            hit(
                &n.to_string(),
                json!({"title": format!("Post {}", n), "status": "published", "views": n * 10}),
            )
        })
        .collect()
}
