//! HTTP client for the hosted shared document.
//!
//! The host stores one JSON document per bin. Reads hit the `latest`
//! endpoint and arrive wrapped in a `record` envelope; writes PUT the whole
//! document back.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;

use cuetprep_core::domain::SharedDocument;

use crate::config::CloudConfig;
use crate::error::{CloudSyncError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Authentication header expected by the document host (`X-Master-Key` on
/// the wire; header names are case-insensitive).
const MASTER_KEY_HEADER: &str = "x-master-key";

/// Read/write access to the hosted shared document. Object-safe so stores
/// can run against a stub transport in tests.
#[async_trait]
pub trait RemoteDocumentSource: Send + Sync {
    /// Fetch the latest revision of the shared document.
    async fn fetch_latest(&self) -> Result<SharedDocument>;

    /// Replace the hosted document wholesale.
    async fn put_document(&self, document: &SharedDocument) -> Result<()>;
}

/// Envelope returned by the read endpoint.
#[derive(Debug, Deserialize)]
struct BinReadResponse {
    record: SharedDocument,
}

/// Error body shape returned by the document host.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
}

/// Client for a single hosted document bin.
#[derive(Debug, Clone)]
pub struct SharedBinClient {
    client: reqwest::Client,
    base_url: String,
    bin_id: String,
    api_key: String,
}

impl SharedBinClient {
    pub fn new(config: &CloudConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bin_id: config.bin_id.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&self.api_key)
            .map_err(|_| CloudSyncError::config("API key contains invalid header characters"))?;
        headers.insert(MASTER_KEY_HEADER, key_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[CloudSync] API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[CloudSync] API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(CloudSyncError::api(status.as_u16(), error.message));
            }
            return Err(CloudSyncError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "[CloudSync] Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            CloudSyncError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl RemoteDocumentSource for SharedBinClient {
    /// GET {base}/b/{binId}/latest
    async fn fetch_latest(&self) -> Result<SharedDocument> {
        let url = format!("{}/b/{}/latest", self.base_url, self.bin_id);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        let envelope: BinReadResponse = Self::parse_response(response).await?;
        Ok(envelope.record)
    }

    /// PUT {base}/b/{binId}
    async fn put_document(&self, document: &SharedDocument) -> Result<()> {
        let url = format!("{}/b/{}", self.base_url, self.bin_id);

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(document)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(CloudSyncError::api(status.as_u16(), error.message));
            }
            return Err(CloudSyncError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use chrono::Utc;
    use cuetprep_core::domain::UserRecord;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        method: String,
        path: String,
        master_key: Option<String>,
        body: String,
    }

    #[derive(Debug, Clone)]
    struct MockResponse {
        status: u16,
        body: String,
    }

    fn header_end_offset(buffer: &[u8]) -> Option<usize> {
        buffer.windows(4).position(|window| window == b"\r\n\r\n")
    }

    async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if header_end_offset(&buffer).is_some() {
                break;
            }
        }

        let header_end = header_end_offset(&buffer)?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next()?.to_string();
        let mut parts = request_line.split_whitespace();
        let method = parts.next()?.to_string();
        let path = parts.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buffer[header_end + 4..].to_vec();
        while body.len() < content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        Some(CapturedRequest {
            method,
            path,
            master_key: headers.get("x-master-key").cloned(),
            body: String::from_utf8_lossy(&body).to_string(),
        })
    }

    fn status_text(status: u16) -> &'static str {
        match status {
            200 => "OK",
            401 => "Unauthorized",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Error",
        }
    }

    async fn write_http_response(
        stream: &mut tokio::net::TcpStream,
        status: u16,
        body: &str,
    ) -> std::io::Result<()> {
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            status_text(status),
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.flush().await
    }

    async fn start_mock_server(
        responses: Vec<MockResponse>,
    ) -> (
        String,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
        let scripted = Arc::new(TokioMutex::new(VecDeque::from(responses)));
        let captured_clone = Arc::clone(&captured);
        let scripted_clone = Arc::clone(&scripted);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let captured_inner = Arc::clone(&captured_clone);
                let scripted_inner = Arc::clone(&scripted_clone);
                tokio::spawn(async move {
                    let Some(request) = read_http_request(&mut stream).await else {
                        return;
                    };
                    captured_inner.lock().await.push(request);

                    let response =
                        scripted_inner.lock().await.pop_front().unwrap_or(MockResponse {
                            status: 500,
                            body: r#"{"message":"unexpected request"}"#.to_string(),
                        });
                    let _ = write_http_response(&mut stream, response.status, &response.body).await;
                });
            }
        });

        (format!("http://{}", addr), captured, handle)
    }

    fn client_for(base_url: &str) -> SharedBinClient {
        SharedBinClient::new(&CloudConfig::new("test-master-key", "bin-1", base_url))
    }

    fn record_envelope(document: &SharedDocument) -> String {
        serde_json::to_string(&serde_json::json!({
            "record": document,
            "metadata": { "id": "bin-1", "private": true }
        }))
        .expect("serialize envelope")
    }

    #[tokio::test]
    async fn fetch_latest_unwraps_the_record_envelope() {
        let mut document = SharedDocument::default();
        document
            .users
            .insert("u1".to_string(), UserRecord::new("u1", Utc::now()));
        let (base_url, captured, server) = start_mock_server(vec![MockResponse {
            status: 200,
            body: record_envelope(&document),
        }])
        .await;

        let fetched = client_for(&base_url)
            .fetch_latest()
            .await
            .expect("fetch success");

        assert_eq!(fetched, document);
        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/b/bin-1/latest");
        assert_eq!(requests[0].master_key.as_deref(), Some("test-master-key"));

        server.abort();
    }

    #[tokio::test]
    async fn put_document_sends_the_bare_document() {
        let (base_url, captured, server) = start_mock_server(vec![MockResponse {
            status: 200,
            body: r#"{"record":{},"metadata":{}}"#.to_string(),
        }])
        .await;

        let document = SharedDocument::default();
        client_for(&base_url)
            .put_document(&document)
            .await
            .expect("put success");

        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path, "/b/bin-1");
        // The write body is the document itself, not a record envelope.
        let sent: SharedDocument =
            serde_json::from_str(&requests[0].body).expect("parse sent body");
        assert_eq!(sent, document);

        server.abort();
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_api_error() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse {
            status: 401,
            body: r#"{"message":"Invalid X-Master-Key provided"}"#.to_string(),
        }])
        .await;

        let err = client_for(&base_url)
            .fetch_latest()
            .await
            .expect_err("fetch should fail");

        assert_eq!(err.status_code(), Some(401));
        assert!(err.to_string().contains("Invalid X-Master-Key"));

        server.abort();
    }

    #[tokio::test]
    async fn malformed_success_body_is_an_api_error() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse {
            status: 200,
            body: r#"{"unexpected":"shape"}"#.to_string(),
        }])
        .await;

        let err = client_for(&base_url)
            .fetch_latest()
            .await
            .expect_err("fetch should fail");

        assert!(matches!(err, CloudSyncError::Api { status: 200, .. }));

        server.abort();
    }
}
