//! Generic list manager for user-scoped record collections.
//!
//! `ListResourceManager<T>` keeps an in-memory list of records in step with
//! a `RemoteStore`, tracks whether the form is creating a new record or
//! editing an existing one, and publishes a `Committed` event after every
//! confirmed write.

pub mod error;
pub mod list;

pub use error::ManagerError;
pub use list::{Committed, EditSession, ListResourceManager};
