use super::error::{ApiError, Result};
use super::models::{
    CreateResponse, ErrorBody, Metadata, MetadataResponse, Record, RecordId, RecordPayload,
};
use super::service::RecordService;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub struct PasajesClient {
    base_url: Url,
    default_headers: HeaderMap,
    client: reqwest::Client,
}

impl PasajesClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        // Trailing slash so endpoints join under a base path instead of replacing it
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::Config {
            message: format!("invalid base URL {}: {}", base_url, e),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(timeout);
        }
        #[cfg(target_arch = "wasm32")]
        let _ = timeout;
        let client = builder.build().map_err(|e| ApiError::Config {
            message: format!("failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            base_url,
            default_headers: headers,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| ApiError::Config {
            message: format!("invalid endpoint {}: {}", path, e),
        })
    }

    /// `/api/pasajes`, scoped with `ruta_id` only for a non-empty route
    pub fn records_url(&self, route_id: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint("api/pasajes")?;
        if let Some(route_id) = route_id.filter(|r| !r.is_empty()) {
            url.query_pairs_mut().append_pair("ruta_id", route_id);
        }
        Ok(url)
    }

    pub fn record_url(&self, id: RecordId) -> Result<Url> {
        self.endpoint(&format!("api/pasajes/{}", id))
    }

    /// Helper to create better error messages from reqwest errors
    fn format_reqwest_error(e: reqwest::Error, url: &Url, operation: &str) -> ApiError {
        if e.is_timeout() {
            ApiError::Network {
                message: format!(
                    "Failed to {} for {}: timeout - request took too long",
                    operation, url
                ),
            }
        } else if {
            #[cfg(not(target_arch = "wasm32"))]
            {
                e.is_connect()
            }
            #[cfg(target_arch = "wasm32")]
            {
                false // is_connect not available on WASM
            }
        } {
            ApiError::Network {
                message: format!(
                    "Failed to {} for {}: connection error - is the server running? Error: {}",
                    operation, url, e
                ),
            }
        } else if e.is_decode() {
            ApiError::Decode {
                message: format!(
                    "Failed to {} for {}: unexpected response format from server. Error: {}",
                    operation, url, e
                ),
            }
        } else {
            ApiError::Network {
                message: format!("Failed to {} for {}: {}. Debug details: {:?}", operation, url, e, e),
            }
        }
    }

    /// Headers for a single request: defaults, a fresh request id and the
    /// current trace context.
    fn request_headers(&self) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        if let Ok(request_id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert(REQUEST_ID_HEADER, request_id);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            use opentelemetry::Context;
            use opentelemetry::global;

            struct HeaderInjector {
                headers: reqwest::header::HeaderMap,
            }
            impl opentelemetry::propagation::Injector for HeaderInjector {
                fn set(&mut self, key: &str, value: String) {
                    if let Ok(header_name) = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                    {
                        if let Ok(header_value) = reqwest::header::HeaderValue::from_str(&value) {
                            self.headers.insert(header_name, header_value);
                        }
                    }
                }
            }

            let mut injector = HeaderInjector { headers };
            global::get_text_map_propagator(|propagator| {
                propagator.inject_context(&Context::current(), &mut injector);
            });
            headers = injector.headers;
        }

        headers
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// Non-2xx responses become [`ApiError::Server`] carrying the `error` field of
    /// the body when it is JSON.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&RecordPayload>,
        operation: &str,
    ) -> Result<String> {
        debug!("[PasajesClient] {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(self.request_headers());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = Self::format_reqwest_error(e, &url, operation);
            error!("[PasajesClient] {} {} failed: {}", method, url, err);
            err
        })?;

        Self::handle_response(response, &url).await.map_err(|e| {
            error!("[PasajesClient] {} {} returned error: {}", method, url, e);
            e
        })
    }

    async fn handle_response(response: reqwest::Response, url: &Url) -> Result<String> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| ApiError::Network {
            message: format!("Failed to read response body from {}: {}", url, e),
        })?;

        if !status.is_success() {
            return Err(Self::server_error(status.as_u16(), url, &response_text));
        }

        Ok(response_text)
    }

    fn server_error(status: u16, url: &Url, body: &str) -> ApiError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error);
        ApiError::Server {
            status,
            url: url.to_string(),
            message,
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(text: &str, url: &Url) -> Result<T> {
        serde_json::from_str(text).map_err(|e| ApiError::Decode {
            message: format!(
                "Failed to parse response from {}: {} - Response: {}",
                url,
                e,
                text.chars().take(200).collect::<String>()
            ),
        })
    }

    /// Metadata endpoint reports database failures as `{error}`, sometimes with 2xx
    fn parse_metadata(text: &str, url: &Url) -> Result<Metadata> {
        match Self::decode::<MetadataResponse>(text, url)? {
            MetadataResponse::Success(metadata) => Ok(metadata),
            MetadataResponse::Failure { error } => Err(ApiError::Server {
                status: 200,
                url: url.to_string(),
                message: Some(error),
            }),
        }
    }
}

#[async_trait]
impl RecordService for PasajesClient {
    async fn fetch_metadata(&self) -> Result<Metadata> {
        let url = self.endpoint("api/metadata")?;
        let text = self
            .send(Method::GET, url.clone(), None, "fetch metadata")
            .await?;
        let metadata = Self::parse_metadata(&text, &url)?;
        debug!(
            "[PasajesClient] Metadata loaded: {} routes, {} units, {} fare types",
            metadata.routes.len(),
            metadata.units.len(),
            metadata.fare_types.len()
        );
        Ok(metadata)
    }

    async fn list_records(&self, route_id: Option<&str>) -> Result<Vec<Record>> {
        let url = self.records_url(route_id)?;
        let text = self
            .send(Method::GET, url.clone(), None, "list pasajes")
            .await?;
        let records: Vec<Record> = Self::decode(&text, &url)?;
        debug!("[PasajesClient] Listed {} pasajes", records.len());
        Ok(records)
    }

    async fn create_record(&self, payload: &RecordPayload) -> Result<()> {
        let url = self.records_url(None)?;
        let text = self
            .send(Method::POST, url, Some(payload), "create pasaje")
            .await?;
        let created = serde_json::from_str::<CreateResponse>(&text).unwrap_or_default();
        info!(
            "[PasajesClient] Pasaje created: {} (valor={:?})",
            created.message.as_deref().unwrap_or("ok"),
            created.valor
        );
        Ok(())
    }

    async fn update_record(&self, id: RecordId, payload: &RecordPayload) -> Result<()> {
        let url = self.record_url(id)?;
        self.send(Method::PUT, url, Some(payload), "update pasaje")
            .await?;
        info!("[PasajesClient] Pasaje {} updated", id);
        Ok(())
    }

    async fn delete_record(&self, id: RecordId) -> Result<()> {
        let url = self.record_url(id)?;
        self.send(Method::DELETE, url, None, "delete pasaje").await?;
        info!("[PasajesClient] Pasaje {} deleted", id);
        Ok(())
    }

    async fn export_csv(&self) -> Result<String> {
        let url = self.endpoint("export/csv")?;
        self.send(Method::GET, url, None, "export csv").await
    }
}
