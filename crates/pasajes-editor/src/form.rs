use chrono::NaiveDateTime;
use pasajes_client::{Record, RecordPayload};

use crate::error::EditorError;
use crate::metadata::MetadataCache;

/// Representation of the travel time in the form, `2025-01-13T10:00`
pub const INPUT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Representation the server expects in `fecha__viaje`, `2025-01-13 10:00`
pub const PAYLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Route,
    Unit,
    FareType,
    TravelAt,
    PassengerName,
}

impl FormField {
    /// Fields in the order they appear in the form
    pub const ALL: [FormField; 5] = [
        FormField::Route,
        FormField::Unit,
        FormField::FareType,
        FormField::TravelAt,
        FormField::PassengerName,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Route => "Ruta",
            FormField::Unit => "Unidad",
            FormField::FareType => "Tipo de pasaje",
            FormField::TravelAt => "Fecha de viaje",
            FormField::PassengerName => "Nombre del pasajero",
        }
    }

    /// Select fields take their value from the metadata options
    pub fn is_select(&self) -> bool {
        matches!(
            self,
            FormField::Route | FormField::Unit | FormField::FareType
        )
    }
}

/// Raw values of the form controls.
///
/// Select fields hold the option value (the reference id as a string), the
/// travel field holds the `T`-separated input representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub route_id: String,
    pub unit_id: String,
    pub fare_type_id: String,
    pub travel_at: String,
    pub passenger_name: String,
}

impl FormValues {
    /// Values for a brand new record: everything empty except the travel time
    pub fn blank(now: NaiveDateTime) -> Self {
        Self {
            travel_at: format_input_time(now),
            ..Self::default()
        }
    }

    /// Populate every field from a record of the current snapshot.
    ///
    /// Reference ids come from the record when the server sent them, otherwise
    /// they are resolved from the labels through the metadata.
    pub fn from_record(record: &Record, metadata: &MetadataCache) -> Self {
        Self {
            route_id: record
                .route_id
                .clone()
                .or_else(|| metadata.route_id_by_name(&record.route_name))
                .unwrap_or_default(),
            unit_id: record
                .unit_id
                .clone()
                .or_else(|| metadata.unit_id_by_number(&record.unit_number))
                .unwrap_or_default(),
            fare_type_id: record
                .fare_type_id
                .clone()
                .or_else(|| metadata.fare_type_id_by_description(&record.fare_description))
                .unwrap_or_default(),
            travel_at: format_input_time(record.travel_at),
            passenger_name: record.passenger_name.clone(),
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Route => &self.route_id,
            FormField::Unit => &self.unit_id,
            FormField::FareType => &self.fare_type_id,
            FormField::TravelAt => &self.travel_at,
            FormField::PassengerName => &self.passenger_name,
        }
    }

    pub fn get_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Route => &mut self.route_id,
            FormField::Unit => &mut self.unit_id,
            FormField::FareType => &mut self.fare_type_id,
            FormField::TravelAt => &mut self.travel_at,
            FormField::PassengerName => &mut self.passenger_name,
        }
    }

    /// Build the request body.
    ///
    /// Only checks what the form itself would enforce: every field is required
    /// and the travel time must be a complete date and time.
    pub fn to_payload(&self) -> Result<RecordPayload, EditorError> {
        if let Some(field) = FormField::ALL
            .into_iter()
            .find(|field| self.get(*field).trim().is_empty())
        {
            return Err(EditorError::MissingField(field));
        }

        let travel_at = NaiveDateTime::parse_from_str(self.travel_at.trim(), INPUT_TIME_FORMAT)
            .map_err(|_| EditorError::InvalidTravelTime(self.travel_at.clone()))?;

        Ok(RecordPayload {
            route_id: self.route_id.clone(),
            unit_id: self.unit_id.clone(),
            fare_type_id: self.fare_type_id.clone(),
            travel_at: travel_at.format(PAYLOAD_TIME_FORMAT).to_string(),
            passenger_name: self.passenger_name.clone(),
        })
    }
}

pub fn format_input_time(value: NaiveDateTime) -> String {
    value.format(INPUT_TIME_FORMAT).to_string()
}
