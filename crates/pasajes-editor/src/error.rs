use pasajes_client::ApiError;
use std::path::PathBuf;

use crate::form::FormField;

pub const SUBMIT_FALLBACK: &str = "No se pudo guardar el pasaje";
pub const DELETE_FALLBACK: &str = "Error al eliminar";
pub const REFRESH_FALLBACK: &str = "Error al cargar datos";
pub const EXPORT_FALLBACK: &str = "No se pudo exportar el reporte";
pub const CONNECTION_ERROR: &str = "Error de conexión";

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("El campo '{}' es obligatorio", .0.label())]
    MissingField(FormField),

    #[error("Fecha de viaje invalida '{0}', se espera AAAA-MM-DDTHH:MM")]
    InvalidTravelTime(String),

    #[error("Failed to save pasaje: {0}")]
    Submit(#[source] ApiError),

    #[error("Failed to delete pasaje: {0}")]
    Delete(#[source] ApiError),

    #[error("Failed to load pasajes: {0}")]
    Refresh(#[source] ApiError),

    #[error("Failed to export CSV: {0}")]
    Export(#[source] ApiError),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EditorError {
    /// Text to show the user: the server's own message when it sent one,
    /// otherwise a fixed fallback per action.
    pub fn user_message(&self) -> String {
        let from_api = |err: &ApiError, fallback: &str| {
            if let Some(message) = err.server_message() {
                message.to_string()
            } else if err.is_network() {
                CONNECTION_ERROR.to_string()
            } else {
                fallback.to_string()
            }
        };

        match self {
            EditorError::MissingField(_) | EditorError::InvalidTravelTime(_) => self.to_string(),
            EditorError::Submit(err) => from_api(err, SUBMIT_FALLBACK),
            EditorError::Delete(err) => from_api(err, DELETE_FALLBACK),
            EditorError::Refresh(err) => from_api(err, REFRESH_FALLBACK),
            EditorError::Export(err) => from_api(err, EXPORT_FALLBACK),
            EditorError::Io { .. } => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = EditorError::Submit(ApiError::Server {
            status: 500,
            url: "http://localhost:5000/api/pasajes".to_string(),
            message: Some("ORA-01400: cannot insert NULL".to_string()),
        });
        assert_eq!(err.user_message(), "ORA-01400: cannot insert NULL");
    }

    #[test]
    fn test_user_message_fallbacks() {
        let without_body = ApiError::Server {
            status: 502,
            url: "http://localhost:5000/api/pasajes".to_string(),
            message: None,
        };
        assert_eq!(
            EditorError::Submit(without_body.clone()).user_message(),
            SUBMIT_FALLBACK
        );
        assert_eq!(
            EditorError::Delete(without_body).user_message(),
            DELETE_FALLBACK
        );

        let network = ApiError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(EditorError::Submit(network).user_message(), CONNECTION_ERROR);
    }

    #[test]
    fn test_missing_field_names_the_field() {
        let err = EditorError::MissingField(FormField::PassengerName);
        assert_eq!(
            err.user_message(),
            "El campo 'Nombre del pasajero' es obligatorio"
        );
    }
}
