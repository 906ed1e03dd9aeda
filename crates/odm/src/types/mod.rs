//! Result types: hydrated collections, pagination and the raw response envelope.

mod collection;
mod pagination;
mod response;

pub use collection::Collection;
pub use pagination::Pagination;
pub use response::{HitsSection, SearchEnvelope, ShardReport, TotalHits};
