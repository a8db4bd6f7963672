//! Single owner of the editor state
//!
//! `EditorController` holds the metadata cache, the record store, the active
//! filter and the editor session, and is the only place where they change.
//! Every completed refresh re-checks that an edit target is still in the
//! snapshot; if it is not, the session falls back to create mode before the
//! next render.

use pasajes_client::{RecordId, RecordService};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::EditorError;
use crate::filter::FilterController;
use crate::form::{FormField, FormValues};
use crate::metadata::MetadataCache;
use crate::renderer::{ListRenderer, RowAction, TableBody};
use crate::session::{EditorMode, EditorSession};
use crate::store::{RecordStore, Snapshot};

pub const DELETE_PROMPT: &str = "¿Está seguro de eliminar este pasaje?";

/// Interactive yes/no question asked before irreversible actions
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined; nothing was sent
    Cancelled,
    /// `reset_editor` is set when the deleted record was the one being edited
    Deleted { reset_editor: bool },
}

pub struct EditorController<S> {
    service: S,
    clock: Box<dyn Clock>,
    metadata: MetadataCache,
    store: RecordStore,
    filter: FilterController,
    session: EditorSession,
}

impl<S: RecordService> EditorController<S> {
    pub fn new(service: S) -> Self {
        Self::with_clock(service, SystemClock)
    }

    pub fn with_clock(service: S, clock: impl Clock + 'static) -> Self {
        let clock: Box<dyn Clock> = Box::new(clock);
        let session = EditorSession::new(clock.as_ref());
        Self {
            service,
            clock,
            metadata: MetadataCache::new(),
            store: RecordStore::new(),
            filter: FilterController::new(),
            session,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.filter.active()
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn mode(&self) -> EditorMode {
        self.session.mode()
    }

    pub fn form(&self) -> &FormValues {
        self.session.form()
    }

    /// Direct access for the front-end's input handling
    pub fn form_mut(&mut self) -> &mut FormValues {
        self.session.form_mut()
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        *self.session.form_mut().get_mut(field) = value.into();
    }

    pub fn table(&self) -> TableBody {
        ListRenderer::render(&self.store)
    }

    /// Startup: load metadata once, then the unscoped list.
    ///
    /// A metadata failure only leaves the selects empty; the list is still
    /// loaded.
    pub async fn init(&mut self) -> Result<usize, EditorError> {
        if !self.metadata.load(&self.service).await {
            warn!("[Editor] Continuing without metadata; selects stay empty");
        }
        self.refresh().await
    }

    /// Change the route scope and reload the list for it
    pub async fn set_filter(&mut self, route_id: Option<String>) -> Result<usize, EditorError> {
        if self.filter.set_filter(route_id) {
            info!("[Editor] Filter changed to {:?}", self.filter.active());
        }
        self.refresh().await
    }

    /// Reload the list under the active filter and re-check the edit target
    pub async fn refresh(&mut self) -> Result<usize, EditorError> {
        let result = self
            .store
            .refresh(&self.service, self.filter.active())
            .await
            .map_err(EditorError::Refresh);
        self.reconcile();
        result
    }

    /// Keep `Edit(id)` only while `id` is in a loaded snapshot.
    ///
    /// A failed refresh also ends the edit: the target can no longer be
    /// confirmed to exist.
    fn reconcile(&mut self) {
        let Some(id) = self.session.target() else {
            return;
        };
        match self.store.snapshot() {
            Snapshot::Loaded(_) if self.store.contains(id) => {}
            Snapshot::Loaded(_) => {
                info!("[Editor] Pasaje {} no longer listed, resetting editor", id);
                self.session.reset(self.clock.as_ref());
            }
            Snapshot::Failed(_) => {
                info!("[Editor] Refresh failed while editing pasaje {}, resetting editor", id);
                self.session.reset(self.clock.as_ref());
            }
            Snapshot::Loading => {}
        }
    }

    /// Switch to editing `id`.
    ///
    /// Returns false, changing nothing, when the snapshot has no such record
    /// (a stale row action after a refresh).
    pub fn start_edit(&mut self, id: RecordId) -> bool {
        let Some(record) = self.store.get(id) else {
            debug!("[Editor] Ignoring edit of pasaje {}: not in snapshot", id);
            return false;
        };
        let form = FormValues::from_record(record, &self.metadata);
        self.session.begin_edit(id, form);
        true
    }

    /// Back to create mode; safe to call in any state
    pub fn reset(&mut self) {
        self.session.reset(self.clock.as_ref());
    }

    /// Create or update depending on the mode.
    ///
    /// On failure the mode and every entered value are kept so the user can
    /// correct and resubmit.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, EditorError> {
        let payload = self.session.form().to_payload()?;

        let outcome = match self.session.mode() {
            EditorMode::Create => {
                self.service
                    .create_record(&payload)
                    .await
                    .map_err(EditorError::Submit)?;
                SubmitOutcome::Created
            }
            EditorMode::Edit(id) => {
                self.service
                    .update_record(id, &payload)
                    .await
                    .map_err(EditorError::Submit)?;
                SubmitOutcome::Updated(id)
            }
        };
        info!("[Editor] Submit succeeded: {:?}", outcome);

        self.reset();
        if let Err(e) = self.refresh().await {
            warn!("[Editor] Refresh after submit failed: {}", e);
        }
        Ok(outcome)
    }

    /// Delete `id` after asking for confirmation.
    ///
    /// Only an exact match with the record being edited resets the editor;
    /// edits of other records are untouched.
    pub async fn delete_record(
        &mut self,
        id: RecordId,
        confirm: &mut dyn Confirm,
    ) -> Result<DeleteOutcome, EditorError> {
        if !confirm.confirm(DELETE_PROMPT) {
            debug!("[Editor] Delete of pasaje {} cancelled", id);
            return Ok(DeleteOutcome::Cancelled);
        }

        self.service
            .delete_record(id)
            .await
            .map_err(EditorError::Delete)?;
        info!("[Editor] Pasaje {} deleted", id);

        let reset_editor = self.session.is_editing(id);
        if reset_editor {
            self.reset();
        }
        if let Err(e) = self.refresh().await {
            warn!("[Editor] Refresh after delete failed: {}", e);
        }
        Ok(DeleteOutcome::Deleted { reset_editor })
    }

    /// Run the trigger of a rendered row
    pub async fn dispatch(
        &mut self,
        action: RowAction,
        confirm: &mut dyn Confirm,
    ) -> Result<(), EditorError> {
        match action {
            RowAction::Edit(id) => {
                self.start_edit(id);
                Ok(())
            }
            RowAction::Delete(id) => self.delete_record(id, confirm).await.map(|_| ()),
        }
    }

    /// Download the server's CSV report and write it to `path`
    pub async fn export_csv(&self, path: &Path) -> Result<usize, EditorError> {
        let csv = self
            .service
            .export_csv()
            .await
            .map_err(EditorError::Export)?;
        tokio::fs::write(path, csv.as_bytes())
            .await
            .map_err(|source| EditorError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        info!("[Editor] Exported {} bytes to {}", csv.len(), path.display());
        Ok(csv.len())
    }
}
