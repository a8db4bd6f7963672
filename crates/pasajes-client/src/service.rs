use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Metadata, Record, RecordId, RecordPayload};

/// Operations exposed by the pasajes backend.
///
/// Implemented by [`crate::PasajesClient`] over HTTP and by [`crate::PasajesFake`]
/// in memory.
#[async_trait]
pub trait RecordService: Send + Sync {
    /// `GET /api/metadata`
    async fn fetch_metadata(&self) -> Result<Metadata>;

    /// `GET /api/pasajes[?ruta_id=<id>]`; an empty scope means unscoped
    async fn list_records(&self, route_id: Option<&str>) -> Result<Vec<Record>>;

    /// `POST /api/pasajes`
    async fn create_record(&self, payload: &RecordPayload) -> Result<()>;

    /// `PUT /api/pasajes/{id}`
    async fn update_record(&self, id: RecordId, payload: &RecordPayload) -> Result<()>;

    /// `DELETE /api/pasajes/{id}`
    async fn delete_record(&self, id: RecordId) -> Result<()>;

    /// `GET /export/csv`
    async fn export_csv(&self) -> Result<String>;
}

#[async_trait]
impl<T: RecordService + ?Sized> RecordService for std::sync::Arc<T> {
    async fn fetch_metadata(&self) -> Result<Metadata> {
        (**self).fetch_metadata().await
    }

    async fn list_records(&self, route_id: Option<&str>) -> Result<Vec<Record>> {
        (**self).list_records(route_id).await
    }

    async fn create_record(&self, payload: &RecordPayload) -> Result<()> {
        (**self).create_record(payload).await
    }

    async fn update_record(&self, id: RecordId, payload: &RecordPayload) -> Result<()> {
        (**self).update_record(id, payload).await
    }

    async fn delete_record(&self, id: RecordId) -> Result<()> {
        (**self).delete_record(id).await
    }

    async fn export_csv(&self) -> Result<String> {
        (**self).export_csv().await
    }
}
