use pasajes_client::RecordId;
use tracing::info;

use crate::clock::Clock;
use crate::form::FormValues;

pub const CREATE_TITLE: &str = "Nuevo Pasaje";
pub const CREATE_SUBMIT_LABEL: &str = "Emitir Pasaje";
pub const EDIT_TITLE: &str = "Editar Pasaje";
pub const EDIT_SUBMIT_LABEL: &str = "Actualizar Pasaje";

/// Whether submitting the form creates a record or updates `Edit`'s target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorMode {
    Create,
    Edit(RecordId),
}

/// Mode plus the values currently in the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSession {
    mode: EditorMode,
    form: FormValues,
}

impl EditorSession {
    pub fn new(clock: &dyn Clock) -> Self {
        Self {
            mode: EditorMode::Create,
            form: FormValues::blank(clock.now()),
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn target(&self) -> Option<RecordId> {
        match self.mode {
            EditorMode::Create => None,
            EditorMode::Edit(id) => Some(id),
        }
    }

    pub fn is_editing(&self, id: RecordId) -> bool {
        self.mode == EditorMode::Edit(id)
    }

    pub fn form(&self) -> &FormValues {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormValues {
        &mut self.form
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            EditorMode::Create => CREATE_TITLE,
            EditorMode::Edit(_) => EDIT_TITLE,
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            EditorMode::Create => CREATE_SUBMIT_LABEL,
            EditorMode::Edit(_) => EDIT_SUBMIT_LABEL,
        }
    }

    /// Back to create mode with cleared fields and a fresh default travel time
    pub fn reset(&mut self, clock: &dyn Clock) {
        if let EditorMode::Edit(id) = self.mode {
            info!("[Editor] Leaving edit mode for pasaje {}", id);
        }
        self.mode = EditorMode::Create;
        self.form = FormValues::blank(clock.now());
    }

    pub fn begin_edit(&mut self, id: RecordId, form: FormValues) {
        info!("[Editor] Editing pasaje {}", id);
        self.mode = EditorMode::Edit(id);
        self.form = form;
    }
}
