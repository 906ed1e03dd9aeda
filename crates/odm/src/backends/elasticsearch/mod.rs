//! Elasticsearch transport.
//!
//! Maps the parameter maps assembled by the builder (`index`, `id`, `body`,
//! `from`, `size`, `scroll`, `search_type`, `client.ignore`) onto the
//! official client's request builders.
//!
//! # Example
//!
//! ```ignore
//! use helios_odm::backends::elasticsearch::ElasticsearchTransport;
//! use helios_odm::ConnectionConfig;
//!
//! let config = ConnectionConfig {
//!     hosts: vec!["http://localhost:9200".to_string()],
//!     ..Default::default()
//! };
//! let transport = ElasticsearchTransport::new(&config)?;
//! ```

mod transport;

pub use transport::ElasticsearchTransport;
