//! Reference metadata loaded once at startup
//!
//! The cache turns routes, units and fare types into the option lists of the
//! form selects and the route filter. A failed load is not fatal: the controls
//! stay empty and a reload is the only recovery.

use pasajes_client::{Metadata, RecordService, Unit};
use tracing::{info, warn};

/// Label of the synthetic filter option that clears the route scope
pub const ALL_ROUTES_LABEL: &str = "Todas las rutas";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// The "all routes" entry; its empty value never collides with a real id
    pub fn all_routes() -> Self {
        Self::new("", ALL_ROUTES_LABEL)
    }
}

/// Contents of every selection control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionControls {
    pub routes: Vec<SelectOption>,
    pub units: Vec<SelectOption>,
    pub fare_types: Vec<SelectOption>,
    pub filter: Vec<SelectOption>,
}

impl Default for SelectionControls {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            units: Vec::new(),
            fare_types: Vec::new(),
            filter: vec![SelectOption::all_routes()],
        }
    }
}

impl SelectionControls {
    fn from_metadata(metadata: &Metadata) -> Self {
        let routes: Vec<SelectOption> = metadata
            .routes
            .iter()
            .map(|route| SelectOption::new(route.id.clone(), route.name.clone()))
            .collect();

        let mut filter = Vec::with_capacity(routes.len() + 1);
        filter.push(SelectOption::all_routes());
        filter.extend(routes.iter().cloned());

        Self {
            units: metadata
                .units
                .iter()
                .map(|unit| SelectOption::new(unit.id.clone(), unit_label(unit)))
                .collect(),
            fare_types: metadata
                .fare_types
                .iter()
                .map(|fare| SelectOption::new(fare.id.clone(), fare.description.clone()))
                .collect(),
            routes,
            filter,
        }
    }
}

pub fn unit_label(unit: &Unit) -> String {
    format!("Disco {} - {}", unit.number, unit.plate)
}

#[derive(Debug, Default)]
pub struct MetadataCache {
    metadata: Option<Metadata>,
    controls: SelectionControls,
    last_error: Option<String>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the metadata and rebuild every control, discarding previous contents.
    ///
    /// Returns whether the load succeeded. Failures are logged and leave the
    /// controls empty; there is no retry.
    pub async fn load<S>(&mut self, service: &S) -> bool
    where
        S: RecordService + ?Sized,
    {
        match service.fetch_metadata().await {
            Ok(metadata) => {
                info!(
                    "[Editor] Metadata loaded: {} routes, {} units, {} fare types",
                    metadata.routes.len(),
                    metadata.units.len(),
                    metadata.fare_types.len()
                );
                self.controls = SelectionControls::from_metadata(&metadata);
                self.metadata = Some(metadata);
                self.last_error = None;
                true
            }
            Err(e) => {
                warn!("[Editor] Failed to load metadata: {}", e);
                self.controls = SelectionControls::default();
                self.metadata = None;
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn controls(&self) -> &SelectionControls {
        &self.controls
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn route_id_by_name(&self, name: &str) -> Option<String> {
        self.metadata.as_ref().and_then(|m| {
            m.routes
                .iter()
                .find(|route| route.name == name)
                .map(|route| route.id.clone())
        })
    }

    pub fn unit_id_by_number(&self, number: &str) -> Option<String> {
        self.metadata.as_ref().and_then(|m| {
            m.units
                .iter()
                .find(|unit| unit.number == number)
                .map(|unit| unit.id.clone())
        })
    }

    pub fn fare_type_id_by_description(&self, description: &str) -> Option<String> {
        self.metadata.as_ref().and_then(|m| {
            m.fare_types
                .iter()
                .find(|fare| fare.description == description)
                .map(|fare| fare.id.clone())
        })
    }
}
