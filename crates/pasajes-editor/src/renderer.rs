use chrono::NaiveDateTime;
use pasajes_client::{Record, RecordId};

use crate::store::{RecordStore, Snapshot};

pub const LOADING_TEXT: &str = "Cargando...";
pub const EMPTY_TEXT: &str = "No hay pasajes registrados";
pub const ERROR_TEXT: &str = "Error al cargar datos";

pub const COLUMNS: [&str; 7] = [
    "Fecha", "Ruta", "Disco", "Tipo", "Pasajero", "Valor", "Acciones",
];

/// Trigger attached to a rendered row, carrying the row's id as data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Edit(RecordId),
    Delete(RecordId),
}

impl RowAction {
    pub fn id(&self) -> RecordId {
        match self {
            RowAction::Edit(id) | RowAction::Delete(id) => *id,
        }
    }
}

/// Display projection of one record; cells are already formatted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: RecordId,
    pub travel_at: String,
    pub route: String,
    pub unit: String,
    pub fare_type: String,
    pub passenger: String,
    pub final_value: String,
    pub edit: RowAction,
    pub delete: RowAction,
}

impl RowView {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id,
            travel_at: format_travel_time(record.travel_at),
            route: record.route_name.clone(),
            unit: record.unit_number.clone(),
            fare_type: record.fare_description.clone(),
            passenger: record.passenger_name.clone(),
            final_value: format_currency(record.final_value),
            edit: RowAction::Edit(record.id),
            delete: RowAction::Delete(record.id),
        }
    }

    /// Data cells in column order, without the actions column
    pub fn cells(&self) -> [&str; 6] {
        [
            &self.travel_at,
            &self.route,
            &self.unit,
            &self.fare_type,
            &self.passenger,
            &self.final_value,
        ]
    }
}

/// The table body is exactly one of these at any time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    Loading,
    Empty,
    /// Carries the failure detail; the table itself only shows [`ERROR_TEXT`]
    Error(String),
    Rows(Vec<RowView>),
}

impl TableBody {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            TableBody::Loading => Some(LOADING_TEXT),
            TableBody::Empty => Some(EMPTY_TEXT),
            TableBody::Error(_) => Some(ERROR_TEXT),
            TableBody::Rows(_) => None,
        }
    }

    pub fn rows(&self) -> &[RowView] {
        match self {
            TableBody::Rows(rows) => rows,
            _ => &[],
        }
    }
}

pub struct ListRenderer;

impl ListRenderer {
    /// Pure projection of the store; nothing in the snapshot is modified
    pub fn render(store: &RecordStore) -> TableBody {
        match store.snapshot() {
            Snapshot::Loading => TableBody::Loading,
            Snapshot::Failed(message) => TableBody::Error(message.clone()),
            Snapshot::Loaded(records) if records.is_empty() => TableBody::Empty,
            Snapshot::Loaded(records) => {
                TableBody::Rows(records.values().map(RowView::from_record).collect())
            }
        }
    }
}

pub fn format_currency(value: f64) -> String {
    format!("${:.2}", value)
}

pub fn format_travel_time(value: NaiveDateTime) -> String {
    value.format("%d/%m/%Y %H:%M").to_string()
}
