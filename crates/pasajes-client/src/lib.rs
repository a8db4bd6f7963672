//! Remote record service for pasajes
//!
//! - `service` - RecordService trait (list/create/update/delete/metadata/export)
//! - `client` - PasajesClient (HTTP client)
//! - `fake` - PasajesFake, in-memory backend for tests and offline mode
//! - `models` - API models
//! - `error` - ApiError

pub mod client;
pub mod error;
pub mod fake;
pub mod models;
pub mod service;

pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, PasajesClient};
pub use error::{ApiError, Result};
pub use fake::{FakeCall, FakeOperation, PasajesFake};
pub use models::*;
pub use service::RecordService;
