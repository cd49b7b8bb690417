//! Tour Buddy core library.
//!
//! Everything the front ends need to plan a trip lives here:
//!
//! - `models`: trips, packing items, expenses and memories, plus the
//!   `Resource` trait that describes how each one is validated and stored
//! - `store`: the `RemoteStore` abstraction and an in-memory implementation
//! - `api`: Firestore, Firebase Auth and destination search HTTP clients
//! - `manager`: the generic `ListResourceManager` that keeps a cached list in
//!   step with the remote store
//! - `notify`: trip reminders driven by manager commit events
//! - `auth`, `cache`, `config`: session, local snapshots and settings
//! - `links`: weather and nearby-place links for external apps
//! - `utils`: amount, date and text formatting for display

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod links;
pub mod manager;
pub mod models;
pub mod notify;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use manager::{Committed, EditSession, ListResourceManager, ManagerError};
pub use models::{Expense, Memory, PackingItem, Record, Resource, Trip};
pub use store::{Document, Filter, InMemoryStore, RemoteStore, StoreError};
