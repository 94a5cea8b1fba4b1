// rollcall-api: Async Rust client for the rollcall listing service
//
// Every collection (instructors, emails, readers, tags, backups) shares the
// same REST contract, so a single `ListingClient` covers all of them.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{Credentials, CsrfSource};
pub use client::ListingClient;
pub use error::Error;
pub use models::{ListPage, ListParams, SortDirection};
pub use transport::{TlsMode, TransportConfig};
