use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::ManagerError;
use crate::models::expense::{self, CategoryTotal, ChartSlice, Expense, ExpenseTotal};
use crate::models::record::to_fields;
use crate::models::{Record, Resource, OWNER_FIELD};
use crate::store::{Filter, RemoteStore};

/// Buffer size for the commit event channel.
/// Subscribers drain after each operation, so a handful of slots is plenty.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Whether the form is creating a new record or editing an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditSession {
    #[default]
    Creating,
    Editing(String),
}

impl EditSession {
    pub fn target(&self) -> Option<&str> {
        match self {
            EditSession::Creating => None,
            EditSession::Editing(id) => Some(id),
        }
    }
}

/// Published after the store confirms a write.
#[derive(Debug, Clone, PartialEq)]
pub enum Committed<T> {
    Created(Record<T>),
    Updated(Record<T>),
    Deleted { id: String },
}

/// Controller for one collection of records.
///
/// Writes patch the local list from the store's confirmed result and then
/// reconcile with a full reload. A failed reconcile leaves the patched list
/// in place and sets `needs_reconcile` until the next successful `load`.
///
/// Mutating operations take `&mut self`, so a single manager never has two
/// writes in flight.
pub struct ListResourceManager<T: Resource> {
    store: Arc<dyn RemoteStore>,
    cache: Vec<Record<T>>,
    editing: EditSession,
    draft: T::Draft,
    needs_reconcile: bool,
    events: broadcast::Sender<Committed<T>>,
}

impl<T: Resource> ListResourceManager<T> {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            cache: Vec::new(),
            editing: EditSession::Creating,
            draft: T::Draft::default(),
            needs_reconcile: false,
            events,
        }
    }

    /// Start with a previously saved list, e.g. a local snapshot.
    pub fn with_records(store: Arc<dyn RemoteStore>, records: Vec<Record<T>>) -> Self {
        let mut manager = Self::new(store);
        manager.cache = records;
        manager
    }

    // ===== Accessors =====

    pub fn records(&self) -> &[Record<T>] {
        &self.cache
    }

    pub fn get(&self, id: &str) -> Option<&Record<T>> {
        self.cache.iter().find(|r| r.id == id)
    }

    pub fn editing(&self) -> &EditSession {
        &self.editing
    }

    pub fn draft(&self) -> &T::Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut T::Draft {
        &mut self.draft
    }

    pub fn set_draft(&mut self, draft: T::Draft) {
        self.draft = draft;
    }

    pub fn needs_reconcile(&self) -> bool {
        self.needs_reconcile
    }

    /// Receive `Committed` events for writes made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Committed<T>> {
        self.events.subscribe()
    }

    // ===== Operations =====

    /// Replace the list with the store's current records for `owner`.
    ///
    /// Owner-scoped types need an owner; others load every record. On
    /// failure the existing list is kept. Documents that do not decode as
    /// `T` are logged and left out.
    pub async fn load(&mut self, owner: Option<&str>) -> Result<&[Record<T>], ManagerError> {
        let filter = self.scope(owner)?;
        let docs = self.store.query(T::COLLECTION, filter.as_ref()).await?;
        let records: Vec<_> = docs
            .into_iter()
            .filter_map(|doc| match Record::<T>::from_document(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(collection = T::COLLECTION, error = %e, "Skipping malformed document");
                    None
                }
            })
            .collect();

        debug!(collection = T::COLLECTION, count = records.len(), "Loaded records");
        self.cache = records;
        self.needs_reconcile = false;
        Ok(&self.cache)
    }

    /// Start editing a cached record, copying its fields into the draft.
    /// Any edit already in progress is discarded.
    pub fn begin_edit(&mut self, id: &str) -> Result<&T::Draft, ManagerError> {
        let draft = self
            .get(id)
            .map(|record| record.fields.to_draft())
            .ok_or_else(|| ManagerError::NotFound { id: id.to_string() })?;
        self.draft = draft;
        self.editing = EditSession::Editing(id.to_string());
        Ok(&self.draft)
    }

    /// Drop the draft and go back to creating.
    pub fn cancel_edit(&mut self) {
        self.editing = EditSession::Creating;
        self.draft = T::Draft::default();
    }

    pub async fn save(&mut self, owner: Option<&str>) -> Result<Record<T>, ManagerError> {
        self.save_at(owner, Utc::now()).await
    }

    /// Validate the draft against `now` and create or replace the record.
    ///
    /// Updates replace every stored field: anything the draft does not carry
    /// is gone afterwards. On failure the draft and edit session are kept so
    /// the same call can be retried.
    pub async fn save_at(&mut self, owner: Option<&str>, now: DateTime<Utc>) -> Result<Record<T>, ManagerError> {
        let value = T::from_draft(&self.draft, now)?;
        let owner_id = self.owner_for_write(owner)?;
        let fields = to_fields(&value, owner_id.as_deref())?;

        let (record, event) = match self.editing.clone() {
            EditSession::Creating => {
                let id = self.store.create(T::COLLECTION, fields).await?;
                info!(collection = T::COLLECTION, id = %id, "Created record");
                let record = Record {
                    id,
                    owner_id,
                    fields: value,
                };
                self.cache.push(record.clone());
                (record.clone(), Committed::Created(record))
            }
            EditSession::Editing(id) => {
                self.store
                    .update(T::COLLECTION, &id, fields)
                    .await
                    .map_err(|e| ManagerError::from_store(e, &id))?;
                info!(collection = T::COLLECTION, id = %id, "Updated record");
                let record = Record {
                    id,
                    owner_id,
                    fields: value,
                };
                match self.cache.iter_mut().find(|r| r.id == record.id) {
                    Some(slot) => *slot = record.clone(),
                    None => self.cache.push(record.clone()),
                }
                (record.clone(), Committed::Updated(record))
            }
        };

        self.cancel_edit();
        self.publish(event);
        self.reconcile(owner).await;
        Ok(record)
    }

    /// Delete a record. It leaves the local list as soon as the store
    /// confirms, whether or not the following reload succeeds.
    pub async fn delete(&mut self, owner: Option<&str>, id: &str) -> Result<(), ManagerError> {
        self.owner_for_write(owner)?;
        self.store
            .delete(T::COLLECTION, id)
            .await
            .map_err(|e| ManagerError::from_store(e, id))?;
        info!(collection = T::COLLECTION, id = %id, "Deleted record");

        self.cache.retain(|r| r.id != id);
        if self.editing.target() == Some(id) {
            self.cancel_edit();
        }
        self.publish(Committed::Deleted { id: id.to_string() });
        self.reconcile(owner).await;
        Ok(())
    }

    // ===== Internals =====

    fn scope(&self, owner: Option<&str>) -> Result<Option<Filter>, ManagerError> {
        if !T::OWNER_SCOPED {
            return Ok(None);
        }
        owner
            .map(|o| Some(Filter::eq(OWNER_FIELD, o)))
            .ok_or(ManagerError::NotSignedIn)
    }

    fn owner_for_write(&self, owner: Option<&str>) -> Result<Option<String>, ManagerError> {
        if !T::OWNER_SCOPED {
            return Ok(None);
        }
        owner
            .map(|o| Some(o.to_string()))
            .ok_or(ManagerError::NotSignedIn)
    }

    fn publish(&self, event: Committed<T>) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn reconcile(&mut self, owner: Option<&str>) {
        let reloaded = self.load(owner).await.map(|records| records.len());
        if let Err(e) = reloaded {
            warn!(collection = T::COLLECTION, error = %e, "Reload after write failed, keeping local list");
            self.needs_reconcile = true;
        }
    }
}

// ===== Expense views =====

impl ListResourceManager<Expense> {
    pub fn group_by_category(&self) -> Vec<CategoryTotal> {
        expense::group_by_category(self.cache.iter().map(|r| &r.fields))
    }

    pub fn chart_slices(&self) -> Vec<ChartSlice> {
        expense::chart_slices(&self.group_by_category())
    }

    pub fn total(&self) -> ExpenseTotal {
        expense::total(self.cache.iter().map(|r| &r.fields))
    }
}

// ============================================================================
// Tests
// ============================================================================
