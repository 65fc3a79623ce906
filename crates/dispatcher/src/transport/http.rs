//! HttpTransport - POST deliveries over reqwest

use std::time::Duration;

use contracts::{ContractError, DeliveryResponse, ForwardConfig, OutboundRequest, Transport};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::error::DispatcherError;

/// Delivers forwards as HTTP POST requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a client carrying the configured user agent and request timeout
    pub fn new(config: &ForwardConfig) -> Result<Self, DispatcherError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatcherError::transport_build(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> ContractError {
        if error.is_timeout() {
            ContractError::TransportTimeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ContractError::transport(url, error.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(name = "http_transport_deliver", skip(self, request), fields(url = %request.url))]
    async fn deliver(&self, request: &OutboundRequest) -> Result<DeliveryResponse, ContractError> {
        let url = Url::parse(&request.url).map_err(|e| ContractError::InvalidUrl {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let mut builder = self.client.post(url);
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.headers.contains(CONTENT_TYPE.as_str()) {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        let response = builder
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| self.classify(&request.url, e))?;

        let status = response.status().as_u16();
        debug!(status, "Response received");
        Ok(DeliveryResponse { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Router;
    use bytes::Bytes;
    use contracts::Headers;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    type Seen = Arc<Mutex<Vec<(HeaderMap, Bytes)>>>;

    async fn spawn_receiver(status: u16) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let recorded = Arc::clone(&seen);
        let app = Router::new().route(
            "/hook",
            post(move |headers: HeaderMap, body: Bytes| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().await.push((headers, body));
                    axum::http::StatusCode::from_u16(status).unwrap()
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/hook"), seen)
    }

    fn request(url: &str) -> OutboundRequest {
        let mut headers = Headers::new();
        headers.append("x-custom", "yes");
        headers.append("x-forwarded-for", "10.1.1.1");
        OutboundRequest {
            url: url.to_string(),
            headers,
            body: Bytes::from_static(br#"{"x":1}"#),
        }
    }

    #[tokio::test]
    async fn test_delivers_body_and_headers() {
        let (url, seen) = spawn_receiver(201).await;
        let transport = HttpTransport::new(&ForwardConfig::default()).unwrap();

        let response = transport.deliver(&request(&url)).await.unwrap();
        assert_eq!(response.status, 201);

        let seen = seen.lock().await;
        let (headers, body) = &seen[0];
        assert_eq!(body.as_ref(), br#"{"x":1}"#);
        assert_eq!(headers["x-custom"], "yes");
        assert_eq!(headers["x-forwarded-for"], "10.1.1.1");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let (url, _) = spawn_receiver(500).await;
        let transport = HttpTransport::new(&ForwardConfig::default()).unwrap();

        let response = transport.deliver(&request(&url)).await.unwrap();
        assert_eq!(response.status, 500);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let transport = HttpTransport::new(&ForwardConfig::default()).unwrap();
        let err = transport.deliver(&request("not a url")).await.unwrap_err();
        assert!(matches!(err, ContractError::InvalidUrl { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&ForwardConfig::default()).unwrap();
        let err = transport
            .deliver(&request(&format!("http://{addr}/hook")))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Transport { .. }));
    }
}
