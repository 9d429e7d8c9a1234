use crate::{
    catalog::{Catalog, Item},
    codec,
    error::{InvalidImport, PersistenceWarning},
    filter::{self, ViewFilter, ViewState},
    mode::Mode,
    progress::{self, Progress},
    status::{StatusField, StatusRecord, StatusSnapshot, StatusStore},
    storage::Storage,
};

pub const STORAGE_KEY: &str = "dokkan_checklist_v1";
const CORRUPT_BACKUP_KEY: &str = "dokkan_checklist_v1.corrupt";

/// Outcome of writing the store after a mutation. The mutation itself has
/// already been applied either way.
#[must_use]
#[derive(Debug)]
pub enum SaveStatus {
    Saved,
    Unsaved(PersistenceWarning),
}

impl SaveStatus {
    pub fn warning(self) -> Option<PersistenceWarning> {
        match self {
            SaveStatus::Saved => None,
            SaveStatus::Unsaved(warning) => Some(warning),
        }
    }
}

/// Owns the catalog, every status record, the view settings and the storage
/// medium. All mutations go through `&mut self`, one at a time.
pub struct Tracker<S: Storage> {
    catalog: Catalog,
    store: StatusStore,
    view: ViewState,
    storage: S,
}

impl<S: Storage> Tracker<S> {
    /// Loads prior state (best effort), fills in a default record for every
    /// catalog id and writes the result back.
    pub fn open(catalog: Catalog, mut storage: S) -> (Self, Vec<PersistenceWarning>) {
        let mut warnings = Vec::new();
        let mut may_overwrite = true;
        let store = match load_snapshot(&storage) {
            Ok(snapshot) => StatusStore::from_snapshot(snapshot),
            Err(warning) => {
                tracing::warn!(error = %warning, "discarding saved state");
                may_overwrite = backup_prior(&mut storage);
                warnings.push(warning);
                StatusStore::new()
            }
        };

        let mut tracker = Self {
            catalog,
            store,
            view: ViewState::default(),
            storage,
        };
        let added = tracker.store.ensure(tracker.catalog.ids());
        tracing::debug!(added, records = tracker.store.len(), "status store ready");
        if !may_overwrite {
            tracing::warn!("saved state left in place until the next change");
        } else if let Some(warning) = tracker.persist().warning() {
            warnings.push(warning);
        }
        (tracker, warnings)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn record(&self, id: &str) -> StatusRecord {
        self.store.peek(id)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.store.snapshot()
    }

    /// True when the last mutation could not be written.
    pub fn has_unsaved_changes(&self) -> bool {
        self.store.is_dirty()
    }

    /// Applies the current mode's mutation to one record.
    pub fn activate(&mut self, id: &str) -> SaveStatus {
        let record = self.store.get(id);
        let field = self.view.mode.activation(&record);
        self.store.set_field(id, field);
        tracing::debug!(id, ?field, mode = self.view.mode.label(), "activated");
        self.persist()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.view.mode = mode;
    }

    pub fn set_search(&mut self, text: &str) {
        self.view.search_text = text.to_string();
    }

    pub fn set_category(&mut self, category: &str) {
        self.view.set_category(category);
    }

    pub fn set_view_filter(&mut self, filter: ViewFilter) {
        self.view.view_filter = filter;
    }

    pub fn select_all(&mut self) -> SaveStatus {
        self.set_owned_everywhere(true)
    }

    pub fn select_none(&mut self) -> SaveStatus {
        self.set_owned_everywhere(false)
    }

    fn set_owned_everywhere(&mut self, owned: bool) -> SaveStatus {
        let catalog = &self.catalog;
        let touched = self
            .store
            .bulk_set(|id| catalog.contains(id), StatusField::Owned(owned));
        tracing::debug!(touched, owned, "bulk owned update");
        self.persist()
    }

    pub fn export_state(&self) -> Result<String, serde_json::Error> {
        codec::encode(&self.store.snapshot())
    }

    /// Replaces every record with the decoded token. A rejected token leaves
    /// the store exactly as it was.
    pub fn import_state(&mut self, token: &str) -> Result<SaveStatus, InvalidImport> {
        let snapshot = codec::decode(token).map_err(|err| {
            tracing::warn!(reason = err.reason(), "import rejected");
            err
        })?;
        let imported = snapshot.len();
        self.store.replace_all(snapshot);
        self.store.ensure(self.catalog.ids());
        tracing::info!(imported, "state imported");
        Ok(self.persist())
    }

    pub fn progress(&self) -> Progress {
        progress::progress(&self.catalog, &self.store)
    }

    pub fn visible_items(&self) -> Vec<&Item> {
        filter::visible_items(&self.catalog, &self.store, &self.view)
    }

    fn persist(&mut self) -> SaveStatus {
        let raw = match serde_json::to_string(self.store.records()) {
            Ok(raw) => raw,
            Err(err) => return SaveStatus::Unsaved(PersistenceWarning::Serialize(err)),
        };
        match self.storage.set(STORAGE_KEY, &raw) {
            Ok(()) => {
                self.store.mark_clean();
                SaveStatus::Saved
            }
            Err(err) => {
                tracing::warn!(error = %err, "state not saved");
                SaveStatus::Unsaved(PersistenceWarning::Write(err))
            }
        }
    }
}

fn load_snapshot<S: Storage>(storage: &S) -> Result<StatusSnapshot, PersistenceWarning> {
    let raw = match storage.get(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Ok(StatusSnapshot::new()),
        Err(err) => return Err(PersistenceWarning::Read(err)),
    };
    serde_json::from_str(&raw).map_err(PersistenceWarning::Corrupt)
}

/// Keeps unreadable or corrupt saved state next to the live key before it
/// is replaced. Returns false when no copy could be made.
fn backup_prior<S: Storage>(storage: &mut S) -> bool {
    match storage.copy(STORAGE_KEY, CORRUPT_BACKUP_KEY) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "could not back up saved state");
            false
        }
    }
}
