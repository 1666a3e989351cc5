//! Single-node proof-of-work ledger with a REST API.

pub mod api;
pub mod blockchain;
pub mod config;
