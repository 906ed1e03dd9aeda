//! Recording collaborators and the per-test context.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use helios_odm::config::ConnectionConfig;
use helios_odm::core::{Cache, CacheLookup, CacheTtl, IndicesTransport, MemoryCache, Transport};
use helios_odm::error::{OdmResult, TransportError};
use helios_odm::model::{ModelDefinition, ModelDefinitionBuilder};
use helios_odm::{Connection, ScopeRegistry};

/// One request seen by the [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Operation name (`search`, `index`, `indices.create`, ...).
    pub operation: String,
    /// The parameter map handed to the transport.
    pub params: Value,
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<String, VecDeque<OdmResult<Value>>>>,
}

impl Recorder {
    fn record(&self, operation: &str, params: Value) -> OdmResult<Value> {
        self.calls.lock().push(RecordedCall {
            operation: operation.to_string(),
            params,
        });

        let queued = self
            .responses
            .lock()
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or_else(|| Ok(default_response(operation)))
    }
}

fn default_response(operation: &str) -> Value {
    match operation {
        "search" | "scroll" => {
            json!({"hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}})
        }
        "count" => json!({"count": 0}),
        "index" => json!({"_id": "generated-id", "_index": "posts", "result": "created"}),
        "update" => json!({"result": "updated"}),
        "delete" => json!({"result": "deleted"}),
        "bulk" => json!({"errors": false, "items": []}),
        _ => json!({"acknowledged": true}),
    }
}

/// Transport that records requests and replays queued responses.
///
/// Operations without a queued response get a plausible empty answer.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    recorder: Arc<Recorder>,
    indices: RecordingIndices,
}

impl RecordingTransport {
    /// Creates a transport with nothing queued.
    pub fn new() -> Self {
        init_tracing();
        let recorder = Arc::new(Recorder::default());
        Self {
            indices: RecordingIndices {
                recorder: recorder.clone(),
            },
            recorder,
        }
    }

    /// Queues the next response for `operation`.
    pub fn respond(&self, operation: &str, response: Value) {
        self.recorder
            .responses
            .lock()
            .entry(operation.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    /// Queues a failed request for `operation`.
    pub fn fail(&self, operation: &str, status: u16) {
        self.recorder
            .responses
            .lock()
            .entry(operation.to_string())
            .or_default()
            .push_back(Err(TransportError::Request {
                operation: operation.to_string(),
                status: Some(status),
                message: "queued failure".to_string(),
            }
            .into()));
    }

    /// Every request so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.recorder.calls.lock().clone()
    }

    /// Requests of one operation, in order.
    pub fn calls_to(&self, operation: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }

    /// The most recent request of `operation`.
    pub fn last(&self, operation: &str) -> Option<RecordedCall> {
        self.calls_to(operation).pop()
    }

    /// Number of requests of `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.calls_to(operation).len()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn search(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("search", params)
    }

    async fn count(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("count", params)
    }

    async fn index(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("index", params)
    }

    async fn update(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("update", params)
    }

    async fn delete(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("delete", params)
    }

    async fn bulk(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("bulk", params)
    }

    async fn scroll(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("scroll", params)
    }

    async fn clear_scroll(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("clear_scroll", params)
    }

    fn indices(&self) -> &dyn IndicesTransport {
        &self.indices
    }
}

/// Index namespace of the [`RecordingTransport`], sharing its log.
#[derive(Debug, Clone)]
pub struct RecordingIndices {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl IndicesTransport for RecordingIndices {
    async fn create(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("indices.create", params)
    }

    async fn delete(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("indices.delete", params)
    }

    async fn exists(&self, params: Value) -> OdmResult<bool> {
        let response = self.recorder.record("indices.exists", params)?;
        Ok(response.as_bool().unwrap_or(true))
    }

    async fn put_mapping(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("indices.put_mapping", params)
    }

    async fn update_aliases(&self, params: Value) -> OdmResult<Value> {
        self.recorder.record("indices.update_aliases", params)
    }
}

/// Cache that counts lookups and stores over a [`MemoryCache`].
#[derive(Debug, Default)]
pub struct CountingCache {
    inner: MemoryCache,
    gets: AtomicUsize,
    sets: AtomicUsize,
    fail_lookups: bool,
}

impl CountingCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache whose lookups always error.
    pub fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    /// Number of `get` calls.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls.
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Stores a value directly, bypassing the counters.
    pub async fn seed(&self, key: &str, value: Value) {
        self.inner
            .set(key, value, CacheTtl::Forever)
            .await
            .expect("memory cache never fails");
    }
}

#[async_trait]
impl Cache for CountingCache {
    async fn get(&self, key: &str) -> OdmResult<CacheLookup> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(TransportError::ConnectionFailed {
                message: "cache unavailable".to_string(),
            }
            .into());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: CacheTtl) -> OdmResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }
}

/// Routes the crate's tracing output to the test writer, filtered by
/// `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Everything a test needs: a recording transport, its connection and a
/// fresh scope registry.
pub struct TestContext {
    /// The recording transport behind the connection.
    pub transport: RecordingTransport,
    /// The connection under test.
    pub connection: Arc<Connection>,
    /// The scope registry handed to definitions.
    pub scopes: Arc<ScopeRegistry>,
}

impl TestContext {
    /// A context with default configuration and no cache.
    pub fn new() -> Self {
        Self::with(|connection| connection)
    }

    /// A context whose connection is customized by `configure`.
    pub fn with(configure: impl FnOnce(Connection) -> Connection) -> Self {
        let transport = RecordingTransport::new();
        let connection = Connection::new(Arc::new(transport.clone()), test_config());
        Self {
            transport,
            connection: Arc::new(configure(connection)),
            scopes: Arc::new(ScopeRegistry::new()),
        }
    }

    /// A context with `cache` attached.
    pub fn with_cache(cache: Arc<CountingCache>) -> Self {
        Self::with(|connection| connection.with_cache(cache))
    }

    /// Finishes a definition against this context.
    pub fn define(&self, builder: ModelDefinitionBuilder) -> Arc<ModelDefinition> {
        builder.build(self.connection.clone(), self.scopes.clone())
    }

    /// The `Post` definition used across tests: index `posts`, fillable
    /// `title`, `status`, `views` and `tags`.
    pub fn posts(&self) -> Arc<ModelDefinition> {
        self.define(
            ModelDefinition::builder("Post")
                .index("posts")
                .fillable(["title", "status", "views", "tags"]),
        )
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used by every test connection.
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        hosts: vec!["http://localhost:9200".to_string()],
        cache_prefix: "test".to_string(),
        default_page_size: 10,
        ..Default::default()
    }
}
