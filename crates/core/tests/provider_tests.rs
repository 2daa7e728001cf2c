// ═══════════════════════════════════════════════════════════════════
// Provider Tests — ReqwestHttpClient against a local HTTP listener
// ═══════════════════════════════════════════════════════════════════

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use kamas_tracker_core::errors::CoreError;
use kamas_tracker_core::providers::reqwest_client::ReqwestHttpClient;
use kamas_tracker_core::providers::traits::HttpClient;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — one-shot HTTP server
// ═══════════════════════════════════════════════════════════════════

/// Accept a single connection, read the request head, answer with
/// `status_line` and `body`. Returns the URL to request.
async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}/items/all")
}

/// Client that ignores proxy settings from the environment.
fn client() -> ReqwestHttpClient {
    let inner = reqwest::Client::builder().no_proxy().build().unwrap();
    ReqwestHttpClient::with_client(inner)
}

// ═══════════════════════════════════════════════════════════════════
// Successful responses
// ═══════════════════════════════════════════════════════════════════

mod success {
    use super::*;

    #[tokio::test]
    async fn returns_parsed_body() {
        let url = serve_once("200 OK", r#"{"items":[{"ankama_id":1,"name":"Wheat"}]}"#).await;
        let value = client().get_json(&url).await.unwrap();
        assert_eq!(value["items"][0]["name"], "Wheat");
        assert_eq!(value["items"][0]["ankama_id"], 1);
    }

    #[tokio::test]
    async fn works_through_arc() {
        let url = serve_once("200 OK", r#"{"items":[]}"#).await;
        let shared: Arc<ReqwestHttpClient> = Arc::new(client());
        let value = shared.get_json(&url).await.unwrap();
        assert!(value["items"].as_array().unwrap().is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Failure classification
// ═══════════════════════════════════════════════════════════════════

mod failures {
    use super::*;

    #[tokio::test]
    async fn non_success_status_is_http_status() {
        let url = serve_once("503 Service Unavailable", "").await;
        match client().get_json(&url).await {
            Err(CoreError::HttpStatus { status, url: failed }) => {
                assert_eq!(status, 503);
                assert_eq!(failed, url);
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_is_http_status() {
        let url = serve_once("404 Not Found", r#"{"error":"missing"}"#).await;
        let err = client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, CoreError::HttpStatus { status: 404, .. }));
        assert!(err.is_fetch_error());
    }

    #[tokio::test]
    async fn non_json_body_is_parse_error() {
        let url = serve_once("200 OK", "<html>maintenance</html>").await;
        let err = client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client()
            .get_json(&format!("http://{addr}/items/all"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Network(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn network_error_redacts_query() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client()
            .get_json(&format!("http://{addr}/items?token=secret"))
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════

mod construction {
    use super::*;

    #[tokio::test]
    async fn default_client_reaches_local_server() {
        // 127.0.0.1 may be routed through a proxy set in the environment,
        // so only check that the default client can be built and used.
        let url = serve_once("200 OK", "{}").await;
        let result = ReqwestHttpClient::default().get_json(&url).await;
        assert!(result.is_ok() || result.unwrap_err().is_fetch_error());
    }
}
