use indexmap::IndexMap;
use pasajes_client::{ApiError, Record, RecordId, RecordService};
use tracing::{debug, warn};

/// What the client currently knows about the record list
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// A list query is in flight, or none has completed yet
    Loading,
    /// Server order is preserved
    Loaded(IndexMap<RecordId, Record>),
    /// The last list query failed
    Failed(String),
}

/// Most recently fetched, possibly route-scoped, set of records
#[derive(Debug)]
pub struct RecordStore {
    snapshot: Snapshot,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::Loading,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Re-run the list query and replace the whole snapshot with the answer
    pub async fn refresh<S>(
        &mut self,
        service: &S,
        route_id: Option<&str>,
    ) -> Result<usize, ApiError>
    where
        S: RecordService + ?Sized,
    {
        self.snapshot = Snapshot::Loading;
        match service.list_records(route_id).await {
            Ok(records) => {
                let count = records.len();
                self.replace(records);
                debug!(
                    "[Editor] Snapshot refreshed: {} pasajes (ruta={:?})",
                    count, route_id
                );
                Ok(count)
            }
            Err(e) => {
                warn!("[Editor] Failed to refresh pasajes (ruta={:?}): {}", route_id, e);
                self.snapshot = Snapshot::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn replace(&mut self, records: Vec<Record>) {
        self.snapshot = Snapshot::Loaded(
            records
                .into_iter()
                .map(|record| (record.id, record))
                .collect(),
        );
    }

    /// Resolve an id against the snapshot; never fetches
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        match &self.snapshot {
            Snapshot::Loaded(records) => records.get(&id),
            _ => None,
        }
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        let records = match &self.snapshot {
            Snapshot::Loaded(records) => Some(records.values()),
            _ => None,
        };
        records.into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        match &self.snapshot {
            Snapshot::Loaded(records) => records.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasajes_client::{FakeOperation, PasajesFake, RecordPayload};

    fn payload(route_id: &str, travel_at: &str, name: &str) -> RecordPayload {
        RecordPayload {
            route_id: route_id.to_string(),
            unit_id: "1".to_string(),
            fare_type_id: "1".to_string(),
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
            .with_record_id(RecordId(10), payload("1", "2025-01-10 08:00", "Ana"))
            .with_record_id(RecordId(11), payload("2", "2025-01-11 08:00", "Luis"))
    }

    #[test]
    fn test_new_store_is_loading() {
        let store = RecordStore::new();
        assert_eq!(store.snapshot(), &Snapshot::Loading);
        assert!(store.get(RecordId(1)).is_none());
        assert_eq!(store.records().count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot_keeping_server_order() {
        let fake = fake();
        let mut store = RecordStore::new();

        assert_eq!(store.refresh(&fake, None).await.unwrap(), 2);
        let ids: Vec<RecordId> = store.records().map(|r| r.id).collect();
        assert_eq!(ids, vec![RecordId(11), RecordId(10)]);

        assert_eq!(store.refresh(&fake, Some("1")).await.unwrap(), 1);
        assert!(store.contains(RecordId(10)));
        assert!(!store.contains(RecordId(11)));
    }

    #[tokio::test]
    async fn test_empty_result_is_distinct_from_failure() {
        let fake = fake();
        let mut store = RecordStore::new();

        store.refresh(&fake, Some("9")).await.unwrap();
        assert_eq!(store.snapshot(), &Snapshot::Loaded(IndexMap::new()));
        assert!(store.is_empty());

        fake.fail_next_with_message(FakeOperation::List, "ORA-12541")
            .await;
        assert!(store.refresh(&fake, None).await.is_err());
        assert!(matches!(store.snapshot(), Snapshot::Failed(msg) if msg.contains("ORA-12541")));
    }
}
