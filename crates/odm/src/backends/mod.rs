//! Concrete transports.
//!
//! Each transport is gated behind a feature flag.
//!
//! | Transport | Feature | Description |
//! |-----------|---------|-------------|
//! | Elasticsearch | `elasticsearch` | Official Elasticsearch client over HTTP |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "elasticsearch")]
//! # fn example() -> Result<(), helios_odm::OdmError> {
//! use helios_odm::{Connection, ConnectionConfig};
//!
//! let connection = Connection::elasticsearch(ConnectionConfig::from_env())?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
