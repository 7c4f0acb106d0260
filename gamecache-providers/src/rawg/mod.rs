//! RAWG provider.
//!
//! REST API keyed by an `api_key` query parameter. List endpoints return
//! `{count, next, previous, results}` envelopes.

pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::RawgAdapter;
pub use client::RawgClient;
