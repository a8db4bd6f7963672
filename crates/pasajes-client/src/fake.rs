//! In-memory stand-in for the pasajes backend
//!
//! `PasajesFake` implements [`RecordService`] the way the Flask server behaves:
//! - ids are assigned incrementally on create
//! - `VALOR_FINAL` is the route base price minus the fare type discount
//! - listings join the reference labels and are ordered by travel time, newest first
//!
//! Used by the editor tests and by the terminal front-end's offline mode.
//! Failures can be scripted per operation and every call is logged for assertions.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::models::{FareType, Metadata, Record, RecordId, RecordPayload, Route, Unit};
use crate::service::RecordService;

const FAKE_URL: &str = "fake://pasajes";

const PAYLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const CSV_HEADER: [&str; 7] = [
    "ID_PASAJE",
    "FECHA_VIAJE",
    "RUTA",
    "DISCO",
    "TIPO",
    "PASAJERO",
    "VALOR_FINAL",
];

/// Operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    Metadata,
    List,
    Create,
    Update,
    Delete,
    Export,
}

/// A call received by the fake, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Metadata,
    List { route_id: Option<String> },
    Create(RecordPayload),
    Update(RecordId, RecordPayload),
    Delete(RecordId),
    Export,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    route_id: String,
    unit_id: String,
    fare_type_id: String,
    travel_at: NaiveDateTime,
    passenger_name: String,
    final_value: f64,
}

#[derive(Debug, Default)]
struct FakeState {
    routes: Vec<(Route, f64)>,
    units: Vec<Unit>,
    fare_types: Vec<FareType>,
    records: BTreeMap<RecordId, StoredRecord>,
    next_id: i64,
    failures: HashMap<FakeOperation, ApiError>,
    calls: Vec<FakeCall>,
    expose_reference_ids: bool,
}

impl FakeState {
    fn take_failure(&mut self, operation: FakeOperation) -> Result<()> {
        match self.failures.remove(&operation) {
            Some(err) => {
                debug!("[PasajesFake] Scripted failure for {:?}: {}", operation, err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Mirrors the server: base price of the route times (1 - discount/100)
    fn price(&self, route_id: &str, fare_type_id: &str) -> Result<f64> {
        let base_price = self
            .routes
            .iter()
            .find(|(route, _)| route.id == route_id)
            .map(|(_, price)| *price)
            .ok_or_else(|| server_error(500, format!("Ruta {} no existe", route_id)))?;
        let discount = self
            .fare_types
            .iter()
            .find(|fare| fare.id == fare_type_id)
            .map(|fare| fare.discount.unwrap_or(0.0))
            .ok_or_else(|| server_error(500, format!("Tipo de pasaje {} no existe", fare_type_id)))?;
        Ok(base_price * (1.0 - discount / 100.0))
    }

    fn stored_from_payload(&self, payload: &RecordPayload) -> Result<StoredRecord> {
        if !self.units.iter().any(|unit| unit.id == payload.unit_id) {
            return Err(server_error(
                500,
                format!("Unidad {} no existe", payload.unit_id),
            ));
        }
        let travel_at = NaiveDateTime::parse_from_str(&payload.travel_at, PAYLOAD_TIME_FORMAT)
            .map_err(|e| {
                server_error(
                    500,
                    format!("fecha__viaje invalida '{}': {}", payload.travel_at, e),
                )
            })?;
        Ok(StoredRecord {
            route_id: payload.route_id.clone(),
            unit_id: payload.unit_id.clone(),
            fare_type_id: payload.fare_type_id.clone(),
            travel_at,
            passenger_name: payload.passenger_name.clone(),
            final_value: self.price(&payload.route_id, &payload.fare_type_id)?,
        })
    }

    fn to_record(&self, id: RecordId, stored: &StoredRecord) -> Record {
        let route_name = self
            .routes
            .iter()
            .find(|(route, _)| route.id == stored.route_id)
            .map(|(route, _)| route.name.clone())
            .unwrap_or_default();
        let unit_number = self
            .units
            .iter()
            .find(|unit| unit.id == stored.unit_id)
            .map(|unit| unit.number.clone())
            .unwrap_or_default();
        let fare_description = self
            .fare_types
            .iter()
            .find(|fare| fare.id == stored.fare_type_id)
            .map(|fare| fare.description.clone())
            .unwrap_or_default();

        let expose = self.expose_reference_ids;
        Record {
            id,
            travel_at: stored.travel_at,
            route_name,
            unit_number,
            fare_description,
            passenger_name: stored.passenger_name.clone(),
            final_value: stored.final_value,
            route_id: expose.then(|| stored.route_id.clone()),
            unit_id: expose.then(|| stored.unit_id.clone()),
            fare_type_id: expose.then(|| stored.fare_type_id.clone()),
        }
    }
}

fn server_error(status: u16, message: String) -> ApiError {
    ApiError::Server {
        status,
        url: FAKE_URL.to_string(),
        message: Some(message),
    }
}

pub struct PasajesFake {
    state: Mutex<FakeState>,
}

impl Default for PasajesFake {
    fn default() -> Self {
        Self::new()
    }
}

impl PasajesFake {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1,
                ..FakeState::default()
            }),
        }
    }

    /// A small catalogue with a handful of pasajes, for offline mode
    pub fn demo() -> Self {
        let seeds = [
            ("1", "1", "1", "2025-01-13 10:00", "Ana Torres"),
            ("2", "2", "2", "2025-01-14 07:30", "Luis Paredes"),
            ("1", "3", "3", "2025-01-15 18:45", "Carmen Vega"),
        ];
        let mut fake = Self::new()
            .with_route("1", "Quito - Ambato", 3.50)
            .with_route("2", "Quito - Latacunga", 2.25)
            .with_route("3", "Ambato - Riobamba", 2.00)
            .with_unit("1", "12", "PBA-1234")
            .with_unit("2", "27", "TBC-0456")
            .with_unit("3", "40", "HAB-7788")
            .with_fare_type("1", "Normal", 0.0)
            .with_fare_type("2", "Estudiante", 50.0)
            .with_fare_type("3", "Tercera edad", 50.0);
        for (route_id, unit_id, fare_type_id, travel_at, passenger) in seeds {
            fake = fake.with_record(RecordPayload {
                route_id: route_id.to_string(),
                unit_id: unit_id.to_string(),
                fare_type_id: fare_type_id.to_string(),
                travel_at: travel_at.to_string(),
                passenger_name: passenger.to_string(),
            });
        }
        fake
    }

    pub fn with_route(mut self, id: &str, name: &str, base_price: f64) -> Self {
        self.state.get_mut().routes.push((
            Route {
                id: id.to_string(),
                name: name.to_string(),
            },
            base_price,
        ));
        self
    }

    pub fn with_unit(mut self, id: &str, number: &str, plate: &str) -> Self {
        self.state.get_mut().units.push(Unit {
            id: id.to_string(),
            number: number.to_string(),
            plate: plate.to_string(),
        });
        self
    }

    pub fn with_fare_type(mut self, id: &str, description: &str, discount: f64) -> Self {
        self.state.get_mut().fare_types.push(FareType {
            id: id.to_string(),
            description: description.to_string(),
            discount: Some(discount),
        });
        self
    }

    /// Seed a record with the next free id
    pub fn with_record(mut self, payload: RecordPayload) -> Self {
        let state = self.state.get_mut();
        let id = RecordId(state.next_id);
        Self::seed(state, id, payload);
        self
    }

    /// Seed a record under a fixed id
    pub fn with_record_id(mut self, id: RecordId, payload: RecordPayload) -> Self {
        Self::seed(self.state.get_mut(), id, payload);
        self
    }

    /// Include `ID_RUTA`, `ID_UNIDAD` and `ID_TIPO_PASAJE` in listings
    pub fn with_reference_ids(mut self) -> Self {
        self.state.get_mut().expose_reference_ids = true;
        self
    }

    fn seed(state: &mut FakeState, id: RecordId, payload: RecordPayload) {
        match state.stored_from_payload(&payload) {
            Ok(stored) => {
                state.records.insert(id, stored);
                state.next_id = state.next_id.max(id.0 + 1);
            }
            Err(e) => warn!("[PasajesFake] Ignoring seed record {}: {}", id, e),
        }
    }

    /// Make the next call of `operation` fail with `error`
    pub async fn fail_next(&self, operation: FakeOperation, error: ApiError) {
        self.state.lock().await.failures.insert(operation, error);
    }

    /// Shorthand for a 500 carrying `{"error": message}`
    pub async fn fail_next_with_message(&self, operation: FakeOperation, message: &str) {
        self.fail_next(operation, server_error(500, message.to_string()))
            .await;
    }

    pub async fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn record_ids(&self) -> Vec<RecordId> {
        self.state.lock().await.records.keys().copied().collect()
    }

    /// Remove a record behind the client's back, as another user would
    pub async fn remove_externally(&self, id: RecordId) -> bool {
        self.state.lock().await.records.remove(&id).is_some()
    }
}

#[async_trait]
impl RecordService for PasajesFake {
    async fn fetch_metadata(&self) -> Result<Metadata> {
        let mut state = self.state.lock().await;
        state.calls.push(FakeCall::Metadata);
        state.take_failure(FakeOperation::Metadata)?;

        Ok(Metadata {
            routes: state.routes.iter().map(|(route, _)| route.clone()).collect(),
            units: state.units.clone(),
            fare_types: state.fare_types.clone(),
        })
    }

    async fn list_records(&self, route_id: Option<&str>) -> Result<Vec<Record>> {
        let route_id = route_id.filter(|r| !r.is_empty());
        let mut state = self.state.lock().await;
        state.calls.push(FakeCall::List {
            route_id: route_id.map(str::to_string),
        });
        state.take_failure(FakeOperation::List)?;

        let mut records: Vec<Record> = state
            .records
            .iter()
            .filter(|(_, stored)| route_id.is_none_or(|r| stored.route_id == r))
            .map(|(id, stored)| state.to_record(*id, stored))
            .collect();
        records.sort_by(|a, b| b.travel_at.cmp(&a.travel_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn create_record(&self, payload: &RecordPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(FakeCall::Create(payload.clone()));
        state.take_failure(FakeOperation::Create)?;

        let stored = state.stored_from_payload(payload)?;
        let id = RecordId(state.next_id);
        state.next_id += 1;
        debug!(
            "[PasajesFake] Created pasaje {} (valor={:.2})",
            id, stored.final_value
        );
        state.records.insert(id, stored);
        Ok(())
    }

    async fn update_record(&self, id: RecordId, payload: &RecordPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(FakeCall::Update(id, payload.clone()));
        state.take_failure(FakeOperation::Update)?;

        if !state.records.contains_key(&id) {
            return Err(server_error(404, "Pasaje no encontrado".to_string()));
        }
        let stored = state.stored_from_payload(payload)?;
        state.records.insert(id, stored);
        Ok(())
    }

    async fn delete_record(&self, id: RecordId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(FakeCall::Delete(id));
        state.take_failure(FakeOperation::Delete)?;

        // The server answers 200 even when no row matched
        state.records.remove(&id);
        Ok(())
    }

    async fn export_csv(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        state.calls.push(FakeCall::Export);
        state.take_failure(FakeOperation::Export)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER).map_err(csv_error)?;
        for (id, stored) in state.records.iter() {
            let record = state.to_record(*id, stored);
            writer
                .write_record([
                    record.id.to_string(),
                    record.travel_at.format("%Y-%m-%d %H:%M").to_string(),
                    record.route_name,
                    record.unit_number,
                    record.fare_description,
                    record.passenger_name,
                    format!("{:.2}", record.final_value),
                ])
                .map_err(csv_error)?;
        }

        let data = writer.into_inner().map_err(csv_error)?;
        String::from_utf8(data).map_err(|e| ApiError::Decode {
            message: format!("CSV report is not UTF-8: {}", e),
        })
    }
}

fn csv_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::Decode {
        message: format!("Failed to write CSV report: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(route_id: &str, fare_type_id: &str, travel_at: &str, name: &str) -> RecordPayload {
        RecordPayload {
            route_id: route_id.to_string(),
            unit_id: "1".to_string(),
            fare_type_id: fare_type_id.to_string(),
            travel_at: travel_at.to_string(),
            passenger_name: name.to_string(),
        }
    }

    fn fake() -> PasajesFake {
        PasajesFake::new()
            .with_route("1", "Norte", 4.0)
            .with_route("2", "Sur", 2.0)
            .with_unit("1", "12", "PBA-1234")
            .with_fare_type("1", "Normal", 0.0)
            .with_fare_type("2", "Estudiante", 50.0)
    }

    #[tokio::test]
    async fn test_create_computes_final_value_and_joins_labels() {
        let fake = fake();
        fake.create_record(&payload("1", "2", "2025-01-13 10:00", "Ana"))
            .await
            .unwrap();

        let records = fake.list_records(None).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, RecordId(1));
        assert_eq!(record.route_name, "Norte");
        assert_eq!(record.unit_number, "12");
        assert_eq!(record.fare_description, "Estudiante");
        assert_eq!(record.final_value, 2.0);
        assert_eq!(record.route_id, None);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let fake = fake()
            .with_record(payload("1", "1", "2025-01-10 08:00", "Old"))
            .with_record(payload("2", "1", "2025-01-11 08:00", "Other route"))
            .with_record(payload("1", "1", "2025-01-12 08:00", "New"));

        let names: Vec<String> = fake
            .list_records(Some("1"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.passenger_name)
            .collect();
        assert_eq!(names, vec!["New", "Old"]);

        assert_eq!(fake.list_records(Some("")).await.unwrap().len(), 3);
        assert_eq!(
            fake.calls().await,
            vec![
                FakeCall::List {
                    route_id: Some("1".to_string())
                },
                FakeCall::List { route_id: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_scripted_failure_applies_once() {
        let fake = fake();
        fake.fail_next_with_message(FakeOperation::List, "ORA-12541")
            .await;

        let err = fake.list_records(None).await.unwrap_err();
        assert_eq!(err.server_message(), Some("ORA-12541"));
        assert!(fake.list_records(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let fake = fake();
        let err = fake
            .update_record(RecordId(99), &payload("1", "1", "2025-01-13 10:00", "Ana"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_route() {
        let fake = fake();
        let err = fake
            .create_record(&payload("9", "1", "2025-01-13 10:00", "Ana"))
            .await
            .unwrap_err();
        assert_eq!(err.server_message(), Some("Ruta 9 no existe"));
        assert!(fake.record_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_csv_quotes_fields() {
        let fake = fake().with_record(payload("1", "1", "2025-01-13 10:00", "Torres, Ana"));
        let csv = fake.export_csv().await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "1,2025-01-13 10:00,Norte,12,Normal,\"Torres, Ana\",4.00"
        );
    }

    #[tokio::test]
    async fn test_export_csv_quotes_carriage_return() {
        let fake = fake().with_record(payload("1", "1", "2025-01-13 10:00", "Ana\rTorres"));
        let report = fake.export_csv().await.unwrap();
        assert!(report.contains(",\"Ana\rTorres\","));

        let mut reader = csv::Reader::from_reader(report.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 7);
        assert_eq!(&rows[0][5], "Ana\rTorres");
    }

    #[tokio::test]
    async fn test_demo_catalogue() {
        let fake = PasajesFake::demo();
        let metadata = fake.fetch_metadata().await.unwrap();
        assert_eq!(metadata.routes.len(), 3);
        assert_eq!(fake.list_records(None).await.unwrap().len(), 3);
    }
}
