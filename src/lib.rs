//! Worker node for a decentralized data-collection network.
//!
//! The node accepts sealed (encrypted) job requests, executes the requested
//! collection operation against an external data source, and returns a result
//! sealed under a single-use nonce bound to the originating request.

pub mod apify;
pub mod app_state;
pub mod args;
pub mod capabilities;
pub mod config;
pub mod jobserver;
pub mod models;
pub mod routes;
pub mod services;
pub mod tiktok;
pub mod twitter;

#[cfg(test)]
mod testing;
