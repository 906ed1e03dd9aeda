//! [`Transport`] implementation over the official Elasticsearch client.

use std::fmt::Debug;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesPutMappingParts,
};
use elasticsearch::params::SearchType;
use elasticsearch::{
    BulkParts, ClearScrollParts, CountParts, DeleteParts, Elasticsearch, IndexParts, ScrollParts,
    SearchParts, UpdateParts,
};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{ConnectionConfig, ElasticsearchAuth};
use crate::core::{IndicesTransport, Transport};
use crate::error::{OdmResult, QueryError, TransportError};

/// Transport backed by a single-node Elasticsearch client.
#[derive(Clone)]
pub struct ElasticsearchTransport {
    client: Elasticsearch,
    indices: ElasticsearchIndices,
    host: String,
}

impl Debug for ElasticsearchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchTransport")
            .field("host", &self.host)
            .finish()
    }
}

impl ElasticsearchTransport {
    /// Builds the client from configuration.
    pub fn new(config: &ConnectionConfig) -> OdmResult<Self> {
        let client = Self::build_client(config)?;
        Ok(Self {
            indices: ElasticsearchIndices {
                client: client.clone(),
            },
            client,
            host: config.primary_host().to_string(),
        })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: Elasticsearch) -> Self {
        Self {
            indices: ElasticsearchIndices {
                client: client.clone(),
            },
            client,
            host: String::new(),
        }
    }

    fn build_client(config: &ConnectionConfig) -> OdmResult<Elasticsearch> {
        let parsed_url: elasticsearch::http::Url =
            config.primary_host().parse().map_err(|e| TransportError::ConnectionFailed {
                message: format!("Invalid URL: {}", e),
            })?;

        let timeout = config
            .timeout()
            .map_err(|message| TransportError::ConnectionFailed { message })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).timeout(timeout);

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(auth) = config.auth() {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username, password))
                }
                ElasticsearchAuth::Bearer { token } => builder.auth(Credentials::Bearer(token)),
            };
        }

        let transport = builder
            .build()
            .map_err(|e| TransportError::ConnectionFailed {
                message: format!("Failed to build transport: {}", e),
            })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }
}

// ----------------------------------------------------------------------
// Parameter helpers
// ----------------------------------------------------------------------

fn str_param<'p>(params: &'p Value, key: &str) -> Option<&'p str> {
    params.get(key).and_then(Value::as_str)
}

fn required_str<'p>(params: &'p Value, key: &str, operation: &str) -> OdmResult<&'p str> {
    str_param(params, key).ok_or_else(|| match key {
        "index" => QueryError::MissingIndex {
            operation: operation.to_string(),
        }
        .into(),
        _ => QueryError::MissingIdentifier {
            operation: operation.to_string(),
        }
        .into(),
    })
}

fn body_param(params: &Value) -> Value {
    params.get("body").cloned().unwrap_or_else(|| json!({}))
}

fn ignored_statuses(params: &Value) -> Vec<u16> {
    params
        .pointer("/client/ignore")
        .and_then(Value::as_array)
        .map(|codes| {
            codes
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|code| u16::try_from(code).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn search_type(name: &str) -> Option<SearchType> {
    match name {
        "query_then_fetch" => Some(SearchType::QueryThenFetch),
        "dfs_query_then_fetch" => Some(SearchType::DfsQueryThenFetch),
        _ => None,
    }
}

/// Maps a send result to the decoded body, honouring ignored statuses.
async fn finish(
    operation: &str,
    result: Result<Response, elasticsearch::Error>,
    ignore: &[u16],
) -> OdmResult<Value> {
    let response = result.map_err(|e| TransportError::Request {
        operation: operation.to_string(),
        status: e.status_code().map(|s| s.as_u16()),
        message: e.to_string(),
    })?;

    let status = response.status_code();
    if status.is_success() || ignore.contains(&status.as_u16()) {
        if !status.is_success() {
            debug!(operation, status = status.as_u16(), "Ignoring error status");
        }
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::MalformedResponse {
                operation: operation.to_string(),
                message: e.to_string(),
            })?;
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        return serde_json::from_str(&text).map_err(|e| {
            TransportError::MalformedResponse {
                operation: operation.to_string(),
                message: e.to_string(),
            }
            .into()
        });
    }

    let message = response.text().await.unwrap_or_default();
    Err(TransportError::Request {
        operation: operation.to_string(),
        status: Some(status.as_u16()),
        message,
    }
    .into())
}

#[async_trait]
impl Transport for ElasticsearchTransport {
    async fn search(&self, params: Value) -> OdmResult<Value> {
        let index = str_param(&params, "index");
        let indices: Vec<&str> = index.into_iter().collect();
        let parts = if indices.is_empty() {
            SearchParts::None
        } else {
            SearchParts::Index(&indices)
        };

        let mut request = self.client.search(parts).body(body_param(&params));
        if let Some(from) = params.get("from").and_then(Value::as_i64) {
            request = request.from(from);
        }
        if let Some(size) = params.get("size").and_then(Value::as_i64) {
            request = request.size(size);
        }
        if let Some(scroll) = str_param(&params, "scroll") {
            request = request.scroll(scroll);
        }
        if let Some(kind) = str_param(&params, "search_type").and_then(search_type) {
            request = request.search_type(kind);
        }

        finish("search", request.send().await, &ignored_statuses(&params)).await
    }

    async fn count(&self, params: Value) -> OdmResult<Value> {
        let index = str_param(&params, "index");
        let indices: Vec<&str> = index.into_iter().collect();
        let parts = if indices.is_empty() {
            CountParts::None
        } else {
            CountParts::Index(&indices)
        };

        let result = self.client.count(parts).body(body_param(&params)).send().await;
        finish("count", result, &ignored_statuses(&params)).await
    }

    async fn index(&self, params: Value) -> OdmResult<Value> {
        let index = required_str(&params, "index", "insert")?;
        let parts = match str_param(&params, "id") {
            Some(id) => IndexParts::IndexId(index, id),
            None => IndexParts::Index(index),
        };

        let result = self.client.index(parts).body(body_param(&params)).send().await;
        finish("index", result, &ignored_statuses(&params)).await
    }

    async fn update(&self, params: Value) -> OdmResult<Value> {
        let index = required_str(&params, "index", "update")?;
        let id = required_str(&params, "id", "update")?;

        let result = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(body_param(&params))
            .send()
            .await;
        finish("update", result, &ignored_statuses(&params)).await
    }

    async fn delete(&self, params: Value) -> OdmResult<Value> {
        let index = required_str(&params, "index", "delete")?;
        let id = required_str(&params, "id", "delete")?;

        let result = self.client.delete(DeleteParts::IndexId(index, id)).send().await;
        finish("delete", result, &ignored_statuses(&params)).await
    }

    async fn bulk(&self, params: Value) -> OdmResult<Value> {
        let lines: Vec<JsonBody<Value>> = params
            .get("body")
            .and_then(Value::as_array)
            .map(|lines| lines.iter().cloned().map(JsonBody::new).collect())
            .unwrap_or_default();

        let result = self.client.bulk(BulkParts::None).body(lines).send().await;
        finish("bulk", result, &ignored_statuses(&params)).await
    }

    async fn scroll(&self, params: Value) -> OdmResult<Value> {
        let body = json!({
            "scroll": params.get("scroll").cloned().unwrap_or(Value::Null),
            "scroll_id": params.get("scroll_id").cloned().unwrap_or(Value::Null),
        });

        let result = self.client.scroll(ScrollParts::None).body(body).send().await;
        finish("scroll", result, &ignored_statuses(&params)).await
    }

    async fn clear_scroll(&self, params: Value) -> OdmResult<Value> {
        let scroll_ids = match params.get("scroll_id") {
            Some(Value::Array(ids)) => Value::Array(ids.clone()),
            Some(id) => json!([id]),
            None => json!([]),
        };

        let result = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": scroll_ids }))
            .send()
            .await;
        finish("clear_scroll", result, &ignored_statuses(&params)).await
    }

    fn indices(&self) -> &dyn IndicesTransport {
        &self.indices
    }
}

/// Index management over the official client.
#[derive(Clone)]
struct ElasticsearchIndices {
    client: Elasticsearch,
}

#[async_trait]
impl IndicesTransport for ElasticsearchIndices {
    async fn create(&self, params: Value) -> OdmResult<Value> {
        let index = required_str(&params, "index", "create index")?;
        let result = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body_param(&params))
            .send()
            .await;
        finish("create index", result, &ignored_statuses(&params)).await
    }

    async fn delete(&self, params: Value) -> OdmResult<Value> {
        let index = required_str(&params, "index", "delete index")?;
        let result = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await;
        finish("delete index", result, &ignored_statuses(&params)).await
    }

    async fn exists(&self, params: Value) -> OdmResult<bool> {
        let index = required_str(&params, "index", "index exists")?;
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| TransportError::Request {
                operation: "index exists".to_string(),
                status: e.status_code().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        Ok(response.status_code().is_success())
    }

    async fn put_mapping(&self, params: Value) -> OdmResult<Value> {
        let index = required_str(&params, "index", "put mapping")?;
        let result = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(body_param(&params))
            .send()
            .await;
        finish("put mapping", result, &ignored_statuses(&params)).await
    }

    async fn update_aliases(&self, params: Value) -> OdmResult<Value> {
        let result = self
            .client
            .indices()
            .update_aliases()
            .body(body_param(&params))
            .send()
            .await;
        finish("update aliases", result, &ignored_statuses(&params)).await
    }
}
