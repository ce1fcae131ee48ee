//! Purpose: Library crate backing the `redlist` CLI and integration tests.
//! Exports: `core` (tokens, cursor, binding decoder, errors) and `api` (links, listings, transport).
//! Role: Keeps decode machinery independent of the HTTP transport and CLI.
//! Invariants: Library code logs through `tracing` and never installs a subscriber.
//! Invariants: All fallible operations return `core::error::Error`.
pub mod api;
pub mod core;
