//! Test infrastructure for the object-document mapper.
//!
//! This module provides an in-process transport that records every request
//! and replays queued responses, a cache that counts its calls, and fixtures
//! for search responses.

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
