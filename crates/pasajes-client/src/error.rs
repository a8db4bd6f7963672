/// Failures talking to the remote record service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("HTTP {status} error from {url}: {}", message.as_deref().unwrap_or("no error message"))]
    Server {
        status: u16,
        url: String,
        /// The `error` field of the JSON body, when the server sent one
        message: Option<String>,
    },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Client configuration error: {message}")]
    Config { message: String },
}

impl ApiError {
    /// Message reported by the server itself, suitable for showing to the user
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
