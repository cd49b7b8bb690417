//! Data models for Tour Buddy records.
//!
//! This module contains the record types kept in the remote store:
//!
//! - `Trip`: a named trip with a start time, schedulable for reminders
//! - `PackingItem`: one entry on the packing list
//! - `Expense`: a categorised amount, with grouping and totals for charts
//! - `Memory`: a photo URI with a note
//!
//! Each type implements `Resource`, which names its collection, says whether
//! it is scoped to the signed-in user, and converts between the stored value
//! and its editable form draft.

pub mod expense;
pub mod memory;
pub mod packing;
pub mod record;
pub mod trip;

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use expense::{CategoryTotal, ChartSlice, Expense, ExpenseDraft, ExpenseTotal};
pub use memory::{Memory, MemoryDraft};
pub use packing::{PackingDraft, PackingItem};
pub use record::{Record, OWNER_FIELD};
pub use trip::{Trip, TripDraft};

/// A draft field failed local validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// A record type managed by `ListResourceManager`.
pub trait Resource: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name in the remote store.
    const COLLECTION: &'static str;

    /// Whether records carry the owner's id and are loaded per user.
    const OWNER_SCOPED: bool = true;

    /// Editable form state, holding raw user input.
    type Draft: Clone + Debug + Default + Send + Sync;

    fn to_draft(&self) -> Self::Draft;

    /// Validate a draft and build the value to store.
    fn from_draft(draft: &Self::Draft, now: DateTime<Utc>) -> Result<Self, ValidationError>;
}

/// Reject text that is empty once surrounding whitespace is ignored.
/// The stored value itself is never trimmed.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "must not be empty"))
    } else {
        Ok(value.to_string())
    }
}
