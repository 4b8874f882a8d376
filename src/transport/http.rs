//! HTTP handshake transport.
//!
//! The default [`HandshakeTransport`]: posts the connection arguments and
//! metadata to `http://<host>:<port>/handshake` and returns the response
//! body verbatim for classification. Any network error, timeout or
//! non-success status collapses to `None`, which the classifier reports as
//! a transport failure.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::json;

use super::{HandshakeRequest, HandshakeTransport};

/// Default time budget for one handshake request.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Reqwest-backed handshake transport.
#[derive(Debug, Clone)]
pub struct HttpHandshake {
    client: reqwest::Client,
}

impl HttpHandshake {
    /// Create a transport with the default request timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS))
    }

    /// Create a transport with an explicit request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeTransport for HttpHandshake {
    fn negotiate(
        &self,
        request: HandshakeRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async move {
            let url = format!("http://{}:{}/handshake", request.host, request.port);
            let body = json!({
                "arguments": request.arguments,
                "meta": request.meta,
            });

            match self.client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    response.text().await.ok()
                },
                Ok(response) => {
                    tracing::debug!("handshake rejected with status {}", response.status());
                    None
                },
                Err(err) => {
                    tracing::debug!("handshake transport error: {err}");
                    None
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        let transport = HttpHandshake::with_timeout(Duration::from_millis(200));
        let request = HandshakeRequest {
            // Reserved TEST-NET-1 address, nothing listens there.
            host: "192.0.2.1".to_string(),
            port: 9,
            arguments: Default::default(),
            meta: Default::default(),
        };
        assert_eq!(transport.negotiate(request).await, None);
    }
}
