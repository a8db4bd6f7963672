use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Server-assigned identifier of a pasaje
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id)
    }
}

/// A single pasaje as returned by `GET /api/pasajes`
///
/// The list endpoint joins the reference tables, so the record carries display
/// labels (route name, unit number, fare description). The raw reference ids are
/// optional: only servers that select them send them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID_PASAJE")]
    pub id: RecordId,

    #[serde(rename = "FECHA_VIAJE", with = "travel_time")]
    pub travel_at: NaiveDateTime,

    #[serde(rename = "NOMBRE_RUTA")]
    pub route_name: String,

    #[serde(rename = "NUMERO_DISCO", deserialize_with = "string_or_number")]
    pub unit_number: String,

    #[serde(rename = "DESCRIPCION")]
    pub fare_description: String,

    #[serde(rename = "NOMBRE_PASAJERO")]
    pub passenger_name: String,

    /// Computed by the server from the route base price and the fare discount
    #[serde(rename = "VALOR_FINAL")]
    pub final_value: f64,

    #[serde(
        rename = "ID_RUTA",
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub route_id: Option<String>,

    #[serde(
        rename = "ID_UNIDAD",
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_id: Option<String>,

    #[serde(
        rename = "ID_TIPO_PASAJE",
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub fare_type_id: Option<String>,
}

/// Request body for `POST /api/pasajes` and `PUT /api/pasajes/{id}`
///
/// Ids are the raw values picked in the form selects, sent as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    #[serde(rename = "id_ruta")]
    pub route_id: String,

    #[serde(rename = "id_unidad")]
    pub unit_id: String,

    #[serde(rename = "id_tipo")]
    pub fare_type_id: String,

    /// Space separated, `YYYY-MM-DD HH:MM`
    #[serde(rename = "fecha__viaje")]
    pub travel_at: String,

    #[serde(rename = "nombre_pasajero")]
    pub passenger_name: String,
}

/// Reference data used to fill the selection controls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "rutas", default)]
    pub routes: Vec<Route>,

    #[serde(rename = "unidades", default)]
    pub units: Vec<Unit>,

    #[serde(rename = "tipos", default)]
    pub fare_types: Vec<FareType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(rename = "disco", deserialize_with = "string_or_number")]
    pub number: String,

    #[serde(rename = "placa")]
    pub plate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareType {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(rename = "descripcion")]
    pub description: String,

    /// Discount percentage applied to the route base price
    #[serde(rename = "descuento", default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
}

/// `GET /api/metadata` answers either with the metadata or with `{error}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MetadataResponse {
    Failure { error: String },
    Success(Metadata),
}

/// Error body the server sends alongside non-2xx statuses
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of a successful create
#[derive(Debug, Default, Deserialize)]
pub struct CreateResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub valor: Option<f64>,
}

/// Oracle NUMBER columns arrive as JSON numbers, VARCHAR ones as strings.
/// Both end up as the string value used by the select controls.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// ISO date-time without offset, as produced by Python's `datetime.isoformat()`
pub mod travel_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid FECHA_VIAJE: {}", raw)))
    }
}
