//! HTTP document store client
//!
//! Backs the cascade's `remote` source with a JSON document store reachable
//! at `{url}/{db}/{coll}/{id}`.

pub mod client;

pub use client::*;
