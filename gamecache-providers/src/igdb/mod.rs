//! IGDB provider.
//!
//! Every endpoint is a POST whose body is an Apicalypse query
//! (`fields ...; where ...; limit ...;`). Responses are bare JSON arrays.

pub mod adapter;
pub mod client;
pub mod query;
pub mod types;

pub use adapter::IgdbAdapter;
pub use client::IgdbClient;
