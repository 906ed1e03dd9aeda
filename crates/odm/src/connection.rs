//! Connections: the transport plus the optional cache and page resolver.

use std::fmt;
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::core::{Cache, PageResolver, Transport};
use crate::model::ModelDefinition;
use crate::query::Builder;
use crate::scope::ScopeRegistry;

/// Model type tag of builders created through [`Connection::query`].
pub const GENERIC_MODEL_TYPE: &str = "document";

/// Everything a query needs to run.
pub struct Connection {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn Cache>>,
    page_resolver: Option<Arc<dyn PageResolver>>,
    config: ConnectionConfig,
}

impl Connection {
    /// Creates a connection over `transport` without cache or page resolver.
    pub fn new(transport: Arc<dyn Transport>, config: ConnectionConfig) -> Self {
        Self {
            transport,
            cache: None,
            page_resolver: None,
            config,
        }
    }

    /// Enables response caching through `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolves pagination pages through `resolver`.
    pub fn with_page_resolver(mut self, resolver: Arc<dyn PageResolver>) -> Self {
        self.page_resolver = Some(resolver);
        self
    }

    /// The transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The cache, if any.
    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache.as_ref()
    }

    /// The page resolver, if any.
    pub fn page_resolver(&self) -> Option<&Arc<dyn PageResolver>> {
        self.page_resolver.as_ref()
    }

    /// The configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns an un-modelled, unguarded builder targeting `index`.
    pub fn query(self: &Arc<Self>, index: impl Into<String>) -> Builder {
        let definition = ModelDefinition::builder(GENERIC_MODEL_TYPE)
            .index(index)
            .unguarded()
            .build(self.clone(), Arc::new(ScopeRegistry::new()));
        definition.new_query_without_scopes()
    }
}

#[cfg(feature = "elasticsearch")]
impl Connection {
    /// Connects to the cluster described by `config`.
    pub fn elasticsearch(config: ConnectionConfig) -> crate::error::OdmResult<Self> {
        let transport = crate::backends::elasticsearch::ElasticsearchTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("transport", &self.transport)
            .field("cache", &self.cache)
            .field("page_resolver", &self.page_resolver.is_some())
            .field("config", &self.config)
            .finish()
    }
}
