use crate::config::{Action, BindingContext, Keymap};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use pasajes_client::{RecordId, RecordService};
use pasajes_editor::{DeleteOutcome, EditorController, FormField, SelectOption, SubmitOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use unicode_segmentation::UnicodeSegmentation;

pub type Controller = EditorController<Arc<dyn RecordService>>;

/// Which part of the screen receives typed input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(FormField),
    Table,
}

impl Focus {
    const RING: [Focus; 6] = [
        Focus::Field(FormField::Route),
        Focus::Field(FormField::Unit),
        Focus::Field(FormField::FareType),
        Focus::Field(FormField::TravelAt),
        Focus::Field(FormField::PassengerName),
        Focus::Table,
    ];

    fn position(self) -> usize {
        Self::RING.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::RING[(self.position() + 1) % Self::RING.len()]
    }

    pub fn previous(self) -> Self {
        let len = Self::RING.len();
        Self::RING[(self.position() + len - 1) % len]
    }

    /// Text fields take plain letters as input instead of commands
    pub fn context(self) -> BindingContext {
        match self {
            Focus::Field(field) if !field.is_select() => BindingContext::Editing,
            _ => BindingContext::Navigation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Busy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusLine {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Work that talks to the server; run to completion before the next key is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit,
    /// Answer to the delete modal; a declined one still goes through the
    /// controller so it is recorded as cancelled
    Delete { id: RecordId, confirmed: bool },
    SetFilter(Option<String>),
    Refresh,
    Export,
}

impl Command {
    pub fn progress_text(&self) -> &'static str {
        match self {
            Command::Submit => "Guardando...",
            Command::Delete { .. } => "Eliminando...",
            Command::SetFilter(_) | Command::Refresh => "Cargando...",
            Command::Export => "Exportando...",
        }
    }
}

pub struct State {
    controller: Controller,
    keymap: Keymap,
    export_path: PathBuf,
    focus: Focus,
    selected_index: usize,
    status: StatusLine,
    pending_delete: Option<RecordId>,
    should_quit: bool,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("mode", &self.controller.mode())
            .field("focus", &self.focus)
            .field("selected_index", &self.selected_index)
            .field("status", &self.status)
            .field("pending_delete", &self.pending_delete)
            .finish()
    }
}

impl State {
    pub fn new(controller: Controller, keymap: Keymap, export_path: PathBuf) -> Self {
        Self {
            controller,
            keymap,
            export_path,
            focus: Focus::Table,
            selected_index: 0,
            status: StatusLine::info("Listo"),
            pending_delete: None,
            should_quit: false,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn pending_delete(&self) -> Option<RecordId> {
        self.pending_delete
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Load metadata and the first page of records
    pub async fn init(&mut self) {
        let result = self.controller.init().await;
        self.status = match (result, self.controller.metadata().last_error()) {
            (Err(e), _) => StatusLine::error(e.user_message()),
            (Ok(_), Some(error)) => {
                StatusLine::error(format!("Metadatos no disponibles: {}", error))
            }
            (Ok(count), None) => StatusLine::info(format!("{} pasajes", count)),
        };
    }

    pub fn selected_id(&self) -> Option<RecordId> {
        self.controller
            .store()
            .records()
            .nth(self.selected_index)
            .map(|record| record.id)
    }

    /// Options of a select field, empty for text fields
    pub fn options(&self, field: FormField) -> &[SelectOption] {
        let controls = self.controller.metadata().controls();
        match field {
            FormField::Route => controls.routes.as_slice(),
            FormField::Unit => controls.units.as_slice(),
            FormField::FareType => controls.fare_types.as_slice(),
            FormField::TravelAt | FormField::PassengerName => &[],
        }
    }

    /// Label shown for a field's current value
    pub fn display_value(&self, field: FormField) -> String {
        let value = self.controller.form().get(field);
        if !field.is_select() {
            return value.to_string();
        }
        if value.is_empty() {
            return "Seleccione...".to_string();
        }
        self.options(field)
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label.clone())
            .unwrap_or_else(|| value.to_string())
    }

    pub fn filter_label(&self) -> String {
        let active = self.controller.active_filter().unwrap_or("");
        self.controller
            .metadata()
            .controls()
            .filter
            .iter()
            .find(|option| option.value == active)
            .map(|option| option.label.clone())
            .unwrap_or_else(|| active.to_string())
    }

    /// Translate a key press into local state changes, and the server
    /// command to run if there is one
    pub fn on_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if let Some(id) = self.pending_delete {
            return match key.code {
                KeyCode::Char('y' | 'Y' | 's' | 'S') => {
                    self.pending_delete = None;
                    Some(Command::Delete { id, confirmed: true })
                }
                KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                    self.pending_delete = None;
                    Some(Command::Delete {
                        id,
                        confirmed: false,
                    })
                }
                _ => None,
            };
        }

        let context = self.focus.context();
        if let Some(action) = self.keymap.find_binding(&key, context) {
            debug!("[PasajesTui] {:?} -> {:?}", key.code, action);
            return self.apply_action(action);
        }

        if let Focus::Field(field) = self.focus {
            if context == BindingContext::Editing {
                self.edit_text(field, key);
            }
        }
        None
    }

    fn apply_action(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::NextField => self.focus = self.focus.next(),
            Action::PreviousField => self.focus = self.focus.previous(),
            Action::NextOption => self.cycle_option(true),
            Action::PreviousOption => self.cycle_option(false),
            Action::FocusTable => self.focus = Focus::Table,
            Action::SelectUp => self.selected_index = self.selected_index.saturating_sub(1),
            Action::SelectDown => {
                if self.selected_index + 1 < self.controller.store().len() {
                    self.selected_index += 1;
                }
            }
            Action::EditSelected => {
                let Some(id) = self.selected_id() else {
                    return None;
                };
                if self.controller.start_edit(id) {
                    self.focus = Focus::Field(FormField::Route);
                    self.status = StatusLine::info(format!("Editando pasaje {}", id));
                }
            }
            Action::DeleteSelected => {
                self.pending_delete = self.selected_id();
            }
            Action::NewRecord => {
                self.controller.reset();
                self.focus = Focus::Field(FormField::Route);
                self.status = StatusLine::info("Nuevo pasaje");
            }
            Action::CycleFilter => return Some(Command::SetFilter(self.next_filter())),
            Action::Submit => return Some(Command::Submit),
            Action::Refresh => return Some(Command::Refresh),
            Action::Export => return Some(Command::Export),
            Action::Quit => {
                info!("[PasajesTui] Quit requested");
                self.should_quit = true;
            }
        }
        None
    }

    fn cycle_option(&mut self, forward: bool) {
        let Focus::Field(field) = self.focus else {
            return;
        };
        let options = self.options(field);
        if options.is_empty() {
            return;
        }
        let len = options.len();
        let current = self.controller.form().get(field);
        let next = match options.iter().position(|option| option.value == current) {
            Some(index) if forward => (index + 1) % len,
            Some(index) => (index + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        let value = options[next].value.clone();
        self.controller.set_field(field, value);
    }

    fn next_filter(&self) -> Option<String> {
        let options = &self.controller.metadata().controls().filter;
        let active = self.controller.active_filter().unwrap_or("");
        let index = options
            .iter()
            .position(|option| option.value == active)
            .unwrap_or(0);
        options
            .get((index + 1) % options.len().max(1))
            .map(|option| option.value.clone())
            .filter(|value| !value.is_empty())
    }

    fn edit_text(&mut self, field: FormField, key: KeyEvent) {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return;
        }
        let value = self.controller.form_mut().get_mut(field);
        match key.code {
            KeyCode::Char(c) => value.push(c),
            KeyCode::Backspace => {
                let last = value.grapheme_indices(true).next_back().map(|(i, _)| i);
                if let Some(offset) = last {
                    value.truncate(offset);
                }
            }
            _ => {}
        }
    }

    /// Mark the status line busy before a command's request goes out
    pub fn begin(&mut self, command: &Command) {
        self.status = StatusLine {
            kind: StatusKind::Busy,
            text: command.progress_text().to_string(),
        };
    }

    pub async fn run_command(&mut self, command: Command) {
        self.status = match command {
            Command::Submit => match self.controller.submit().await {
                Ok(SubmitOutcome::Created) => StatusLine::info("Pasaje emitido"),
                Ok(SubmitOutcome::Updated(id)) => {
                    StatusLine::info(format!("Pasaje {} actualizado", id))
                }
                Err(e) => StatusLine::error(format!("Error: {}", e.user_message())),
            },
            Command::Delete { id, confirmed } => {
                match self
                    .controller
                    .delete_record(id, &mut |_: &str| confirmed)
                    .await
                {
                    Ok(DeleteOutcome::Cancelled) => StatusLine::info("Eliminación cancelada"),
                    Ok(DeleteOutcome::Deleted { .. }) => StatusLine::info("Pasaje eliminado"),
                    Err(e) => StatusLine::error(e.user_message()),
                }
            }
            Command::SetFilter(route_id) => match self.controller.set_filter(route_id).await {
                Ok(count) => StatusLine::info(format!("{}: {} pasajes", self.filter_label(), count)),
                Err(e) => StatusLine::error(e.user_message()),
            },
            Command::Refresh => match self.controller.refresh().await {
                Ok(count) => StatusLine::info(format!("{} pasajes", count)),
                Err(e) => StatusLine::error(e.user_message()),
            },
            Command::Export => match self.controller.export_csv(&self.export_path).await {
                Ok(_) => StatusLine::info(format!(
                    "Reporte exportado a {}",
                    self.export_path.display()
                )),
                Err(e) => StatusLine::error(e.user_message()),
            },
        };
        self.clamp_selection();
    }

    /// Handle one key end to end; the event loop splits this in two so the
    /// busy status can be drawn while the request is in flight
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if let Some(command) = self.on_key(key) {
            self.begin(&command);
            self.run_command(command).await;
        }
    }

    fn clamp_selection(&mut self) {
        let rows = self.controller.store().len();
        self.selected_index = self.selected_index.min(rows.saturating_sub(1));
    }
}
