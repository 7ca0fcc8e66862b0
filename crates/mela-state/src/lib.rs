//! mela-state: embedded document store for Mela.
//!
//! Backed by [redb](https://docs.rs/redb). Each resource (locations, alerts,
//! crowd readings, lost-and-found items, devotee timings, settings, routes,
//! feedback) is a JSON document in its own table, keyed by id (settings by
//! their unique key).
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks. Each operation runs in its own
//! redb transaction.

pub mod error;
pub mod input;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult, ValidationError};
pub use store::StateStore;
pub use tables::Document;
pub use types::*;
