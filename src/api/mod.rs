//! Purpose: Define the public Rust API for fetching and holding listing pages.
//! Exports: Entity types, listing orchestration, transport seam, and errors.
//! Role: Stable surface used by the CLI and integration tests.
//! Invariants: Decode internals stay in `core`; this module re-exports what callers need.

mod link;
mod listing;
mod transport;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use link::{Link, LinkFlags, LinkList, ListingType};
pub use listing::{LINK_KIND, ListingClient, decode_link, fetch_listing, listing_locator};
pub use transport::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpTransport, Transport, run_request};
