//! Query construction and execution.
//!
//! - [`clause`] - boolean-query clause fragments
//! - [`body`] - request body assembly and compilation
//! - [`condition`] - `where`-style condition translation
//! - [`regexp`] - regexp flags and options
//! - [`Builder`] - the fluent builder and its terminal operations
//! - [`Bulk`] - bulk action accumulation

pub mod body;
pub mod bulk;
pub mod clause;
pub mod condition;
pub mod regexp;

mod builder;
mod execution;

pub use body::{RequestBody, SortClause, SortDirection, SourceFilter};
pub use builder::{Builder, SubQuery};
pub use bulk::Bulk;
pub use clause::{Clause, ClauseGroup, ClauseType};
pub use condition::{Condition, Operator};
pub use regexp::{RegexpFlags, RegexpOptions};
