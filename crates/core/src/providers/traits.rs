use async_trait::async_trait;

use crate::errors::CoreError;

/// Minimal HTTP access needed to mirror remote catalogs.
///
/// Implementations must keep the failure kinds apart:
/// - transport problems (DNS, timeout, connection reset) → `CoreError::Network`
/// - a response with a non-2xx status → `CoreError::HttpStatus`
/// - a body that is not valid JSON → `CoreError::Parse`
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the parsed JSON body.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, CoreError>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, CoreError> {
        (**self).get_json(url).await
    }
}
