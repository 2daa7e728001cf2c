use thiserror::Error;

/// Unified error type for the entire kamas-tracker-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Startup ─────────────────────────────────────────────────────
    #[error("Initialization failed: {0}")]
    Initialization(String),

    // ── Storage / File ──────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error: {0}")]
    Parse(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Sale not found: {0}")]
    SaleNotFound(u64),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// True for failures reaching a remote catalog (transport or non-2xx status).
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, CoreError::Network(_) | CoreError::HttpStatus { .. })
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters from URLs so tokens never end up in logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
